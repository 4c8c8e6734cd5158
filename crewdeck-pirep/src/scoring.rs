//! Pure point suggestion from flight figures. No I/O, no clock; the
//! validation workflow feeds the result to staff as a default they can
//! override.

/// Base 100 points, plus distance bonuses (over 500 nm, over 1000 nm) and
/// landing-rate bonuses (inside 100 fpm, inside 50 fpm). Bonuses stack, so
/// a 1200 nm flight greased on at -40 fpm scores 100+50+100+50+100 = 400.
/// Boundaries are exclusive: exactly 500 nm or exactly -100 fpm earn
/// nothing extra.
pub fn suggested_points(distance_nm: f64, landing_rate_fpm: f64) -> i32 {
    let mut points = 100;

    if distance_nm > 500.0 {
        points += 50;
    }
    if distance_nm > 1000.0 {
        points += 100;
    }

    let sink = landing_rate_fpm.abs();
    if sink < 100.0 {
        points += 50;
    }
    if sink < 50.0 {
        points += 100;
    }

    points
}
