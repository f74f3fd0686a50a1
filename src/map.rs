/// Check-in is only possible within this distance of a point.
pub const CHECK_IN_RADIUS_KM: f64 = 0.2;

#[derive(Clone, Debug, PartialEq)]
pub struct GachaPoint {
    pub id: u32,
    /// Position on the mock map, percent of width.
    pub x: u16,
    /// Position on the mock map, percent of height.
    pub y: u16,
    pub name: &'static str,
    pub distance_km: f64,
}

impl GachaPoint {
    pub fn in_range(&self) -> bool {
        self.distance_km <= CHECK_IN_RADIUS_KM
    }
}

pub fn gacha_points() -> Vec<GachaPoint> {
    vec![
        GachaPoint {
            id: 1,
            x: 45,
            y: 30,
            name: "Central Park Fountain",
            distance_km: 0.1,
        },
        GachaPoint {
            id: 2,
            x: 70,
            y: 60,
            name: "Hidden Grove",
            distance_km: 0.3,
        },
        GachaPoint {
            id: 3,
            x: 25,
            y: 75,
            name: "Mountain Overlook",
            distance_km: 0.8,
        },
        GachaPoint {
            id: 4,
            x: 80,
            y: 25,
            name: "Secret Beach",
            distance_km: 1.2,
        },
    ]
}

/// First point close enough to check in at.
pub fn nearby_point(points: &[GachaPoint]) -> Option<&GachaPoint> {
    points.iter().find(|p| p.in_range())
}
