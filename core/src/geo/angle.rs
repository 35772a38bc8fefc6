/// Great-circle central angle, in degrees rounded to 0.1°, between a point
/// and the sub-solar point.
///
/// Large angles mean the scene was recorded far from local noon; the position
/// cache stores this value as its GCA column.
pub fn central_angle(lat: f64, lon: f64, subsolar_lat: f64, subsolar_lon: f64) -> f64 {
    let (lat, lon) = (lat.to_radians(), lon.to_radians());
    let (sun_lat, sun_lon) = (subsolar_lat.to_radians(), subsolar_lon.to_radians());
    let cosine =
        lat.sin() * sun_lat.sin() + lat.cos() * sun_lat.cos() * (lon - sun_lon).abs().cos();
    let degrees = cosine.clamp(-1.0, 1.0).acos().to_degrees();
    (degrees * 10.0).round() / 10.0
}
