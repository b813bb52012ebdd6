use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// WGS-84
const WGS84_A_KM: f64 = 6378.137;
const WGS84_E2: f64 = 0.006_694_379_990_14;

/// Fixed ground observer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Observer {
    #[serde(rename = "lat")]
    pub latitude_deg: f64,
    #[serde(rename = "lon")]
    pub longitude_deg: f64,
    #[serde(rename = "alt_m")]
    pub altitude_m: f64,
}

impl Default for Observer {
    /// Montevideo.
    fn default() -> Self {
        Self {
            latitude_deg: -34.9011,
            longitude_deg: -56.1645,
            altitude_m: 20.0,
        }
    }
}

impl Observer {
    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let n = WGS84_A_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        [
            (n + alt_km) * lat.cos() * lon.cos(),
            (n + alt_km) * lat.cos() * lon.sin(),
            (n * (1.0 - WGS84_E2) + alt_km) * sin_lat,
        ]
    }
}

/// Altitude above the observer's horizon, azimuth from north, slant range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct LookAngle {
    pub altitude_deg: f64,
    pub azimuth_deg: f64,
    pub range_km: f64,
}

/// Point on the WGS-84 ellipsoid below the satellite, and height above it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct GeodeticPoint {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

/// Iterative ECEF -> geodetic conversion; converges to well below a metre
/// in a handful of rounds for orbital altitudes.
pub fn ecef_to_geodetic(ecef: [f64; 3]) -> GeodeticPoint {
    let [x, y, z] = ecef;
    let p = (x * x + y * y).sqrt();
    let lon = y.atan2(x);

    let mut lat = z.atan2(p * (1.0 - WGS84_E2));
    let mut alt = 0.0;
    for _ in 0..8 {
        let sin_lat = lat.sin();
        let n = WGS84_A_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        alt = if lat.cos().abs() > 1e-10 {
            p / lat.cos() - n
        } else {
            z.abs() - n * (1.0 - WGS84_E2)
        };
        lat = z.atan2(p * (1.0 - WGS84_E2 * n / (n + alt)));
    }

    GeodeticPoint {
        latitude_deg: lat.to_degrees(),
        longitude_deg: lon.to_degrees(),
        altitude_km: alt,
    }
}

pub fn look_angle(sat_ecef: [f64; 3], observer: &Observer) -> LookAngle {
    let sta = observer.position_ecef_km();
    let dr = [sat_ecef[0] - sta[0], sat_ecef[1] - sta[1], sat_ecef[2] - sta[2]];
    let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

    let (east, north, up) = ecef_to_enu(dr, observer.lat_rad(), observer.lon_rad());
    let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
    let altitude_deg = if range_km > 0.0 {
        (up / range_km).clamp(-1.0, 1.0).asin().to_degrees()
    } else {
        0.0
    };

    LookAngle {
        altitude_deg,
        azimuth_deg,
        range_km,
    }
}
