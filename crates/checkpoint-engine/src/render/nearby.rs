use std::collections::BTreeMap;

use serde::Serialize;

use checkpoint_core::group::{CheckpointGroup, GroupKey, StatusEntry};

use crate::ingest::{Coordinates, Location, LocationCatalog};

/// A positioned checkpoint with its distance and, when known, its status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyCheckpoint {
    pub checkpoint_name: String,
    pub city_name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Rounded to two decimals.
    pub distance_km: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<StatusEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit: Option<StatusEntry>,
}

/// Catalog checkpoints within `radius_km` of `origin`, nearest first.
pub fn nearby(
    catalog: &LocationCatalog,
    groups: &[CheckpointGroup],
    origin: Coordinates,
    radius_km: f64,
) -> Vec<NearbyCheckpoint> {
    let index = by_key(groups);
    catalog
        .nearby(origin, radius_km)
        .into_iter()
        .filter_map(|(loc, km)| view(loc, km, &index))
        .collect()
}

/// The catalog checkpoint nearest to `origin`.
pub fn closest(
    catalog: &LocationCatalog,
    groups: &[CheckpointGroup],
    origin: Coordinates,
) -> Option<NearbyCheckpoint> {
    let (loc, km) = catalog.closest(origin)?;
    view(loc, km, &by_key(groups))
}

fn by_key(groups: &[CheckpointGroup]) -> BTreeMap<GroupKey, &CheckpointGroup> {
    groups.iter().map(|g| (g.key(), g)).collect()
}

fn view(
    loc: &Location,
    km: f64,
    index: &BTreeMap<GroupKey, &CheckpointGroup>,
) -> Option<NearbyCheckpoint> {
    let at = loc.coordinates?;
    let group = index.get(&GroupKey::new(&loc.city, &loc.checkpoint));
    Some(NearbyCheckpoint {
        checkpoint_name: loc.checkpoint.clone(),
        city_name: loc.city.clone(),
        latitude: at.lat,
        longitude: at.lng,
        distance_km: (km * 100.0).round() / 100.0,
        entry: group.and_then(|g| g.entry.clone()),
        exit: group.and_then(|g| g.exit.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkpoint_core::types::ColorBand;

    fn catalog() -> LocationCatalog {
        LocationCatalog::from_json(
            r#"{
                "حوارة": {"city": "نابلس", "lat": 32.153, "lng": 35.257},
                "زعترة": {"city": "نابلس", "lat": 32.118, "lng": 35.243},
                "قلنديا": {"city": "القدس", "lat": 31.864, "lng": 35.216}
            }"#,
        )
        .unwrap()
    }

    fn reconciled() -> Vec<CheckpointGroup> {
        let mut hawara = CheckpointGroup::empty(&GroupKey::new("نابلس", "حوارة"));
        hawara.entry = Some(StatusEntry {
            status: "مغلق".into(),
            color_band: ColorBand::Red,
            reported_at: None,
        });
        vec![hawara]
    }

    #[test]
    fn nearby_joins_status_by_name() {
        let origin = Coordinates::new(32.150, 35.255).unwrap();
        let hits = nearby(&catalog(), &reconciled(), origin, 10.0);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].checkpoint_name, "حوارة");
        assert_eq!(hits[0].distance_km, 0.38);
        assert_eq!(hits[0].entry.as_ref().unwrap().status, "مغلق");
        assert_eq!(hits[1].checkpoint_name, "زعترة");
        assert_eq!(hits[1].distance_km, 3.73);
        assert!(hits[1].entry.is_none() && hits[1].exit.is_none());
    }

    #[test]
    fn closest_reports_distance() {
        let origin = Coordinates::new(31.87, 35.22).unwrap();
        let hit = closest(&catalog(), &[], origin).unwrap();
        assert_eq!(hit.checkpoint_name, "قلنديا");
        assert_eq!(hit.distance_km, 0.77);
        let json = serde_json::to_value(&hit).unwrap();
        assert!(json.get("entry").is_none());
        assert_eq!(json["latitude"], 31.864);
    }
}
