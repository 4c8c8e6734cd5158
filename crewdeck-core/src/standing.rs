use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pilot's accumulated record within one VA. Counters only ever grow;
/// rejecting a report never touches the standing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PilotStanding {
    pub pilot_id: Uuid,
    pub va_id: Uuid,
    pub points: i64,
    pub flights: i64,
    pub hours: f64,
}

impl PilotStanding {
    pub fn zero(pilot_id: Uuid, va_id: Uuid) -> Self {
        Self {
            pilot_id,
            va_id,
            points: 0,
            flights: 0,
            hours: 0.0,
        }
    }

    pub fn apply(&mut self, delta: &StandingDelta) {
        self.points += delta.points;
        self.flights += delta.flights;
        self.hours += delta.hours;
    }
}

/// One approved report's worth of credit.
#[derive(Debug, Clone, Copy)]
pub struct StandingDelta {
    pub points: i64,
    pub flights: i64,
    pub hours: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_accumulates() {
        let mut standing = PilotStanding::zero(Uuid::new_v4(), Uuid::new_v4());
        standing.apply(&StandingDelta {
            points: 250,
            flights: 1,
            hours: 2.5,
        });
        standing.apply(&StandingDelta {
            points: 100,
            flights: 1,
            hours: 1.0,
        });
        assert_eq!(standing.points, 350);
        assert_eq!(standing.flights, 2);
        assert!((standing.hours - 3.5).abs() < f64::EPSILON);
    }
}
