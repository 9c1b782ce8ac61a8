use crate::degrees;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use horizon::{projection::projected_height, RidgePoint, View};

/// Returns every ridge as a `LineString` feature followed by every
/// local maximum as a `Point` feature.
pub fn collection(view: &View) -> FeatureCollection {
    let ridges = view.ridges().iter().enumerate().map(|(idx, ridge)| {
        let mut properties = JsonObject::new();
        properties.insert("ridge".to_owned(), JsonValue::from(idx));
        properties.insert("points".to_owned(), JsonValue::from(ridge.len()));
        feature(
            Value::LineString(ridge.iter().map(position).collect()),
            properties,
        )
    });

    let observer_elevation = view.observer_elevation();
    let summits = view.local_maxima().map(|point| {
        let mut properties = JsonObject::new();
        properties.insert("elevation".to_owned(), JsonValue::from(point.elevation()));
        properties.insert("distance".to_owned(), JsonValue::from(point.distance()));
        properties.insert(
            "bearing".to_owned(),
            JsonValue::from(degrees(view, point.bearing())),
        );
        properties.insert(
            "projected_height".to_owned(),
            JsonValue::from(projected_height(
                observer_elevation,
                point.distance(),
                point.elevation(),
            )),
        );
        feature(Value::Point(position(point)), properties)
    });

    FeatureCollection {
        bbox: None,
        features: ridges.chain(summits).collect(),
        foreign_members: None,
    }
}

/// GeoJSON positions are `[lon, lat]`.
fn position(point: &RidgePoint) -> Vec<f64> {
    let coord = point.coord();
    vec![coord.x, coord.y]
}

fn feature(value: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::collection;
    use geo::geometry::Coord;
    use geojson::{GeoJson, Value};
    use horizon::View;

    const OBSERVER: Coord = Coord {
        x: 9.978751,
        y: 47.020174,
    };

    /// A wall of terrain 3-3.5 km north of the observer.
    fn band(coord: Coord<f64>) -> Option<f64> {
        let north_m = (coord.y - OBSERVER.y).to_radians() * horizon::geodesy::EARTH_RADIUS_M;
        Some(if north_m > 3000.0 && north_m < 3500.0 {
            2500.0
        } else {
            500.0
        })
    }

    fn view_of<S>(source: S) -> View
    where
        S: Fn(Coord<f64>) -> Option<f64>,
    {
        View::builder()
            .observer(OBSERVER)
            .observer_elevation(1000.0)
            .bearing_resolution(360)
            .visual_range(9000.0)
            .min_pass(5)
            .build(&source)
            .unwrap()
    }

    #[test]
    fn test_ridges_and_summits() {
        let view = view_of(band);
        assert!(!view.ridges().is_empty());
        let features = collection(&view).features;

        let lines: Vec<_> = features
            .iter()
            .filter_map(|f| match &f.geometry.as_ref()?.value {
                Value::LineString(line) => Some(line),
                _ => None,
            })
            .collect();
        assert_eq!(lines.len(), view.ridges().len());
        for (line, ridge) in lines.iter().zip(view.ridges()) {
            assert_eq!(line.len(), ridge.len());
            assert_eq!(line[0], vec![ridge[0].coord().x, ridge[0].coord().y]);
        }

        let summits = features
            .iter()
            .filter(|f| matches!(f.geometry.as_ref().map(|g| &g.value), Some(Value::Point(_))))
            .count();
        assert_eq!(summits, view.local_maxima().count());
        assert_eq!(features.len(), lines.len() + summits);
    }

    #[test]
    fn test_empty_view_is_empty_collection() {
        let view = view_of(|_| Some(500.0));
        let json = GeoJson::from(collection(&view)).to_string();
        assert_eq!(
            json.parse::<GeoJson>().unwrap(),
            GeoJson::from(collection(&view))
        );
        assert!(json.contains("FeatureCollection"));
        assert!(collection(&view).features.is_empty());
    }
}
