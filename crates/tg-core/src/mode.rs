//! Transport mode enum shared across the graph engine.
//!
//! Variants 0–12 mirror GTFS `route_type` codes one-to-one (see
//! <https://gtfs.org/reference/static/#routestxt>); `Walking` and `Bike`
//! are synthesized modes built from the transit graphs rather than read
//! from any `route_type`. `Other(n)` preserves an unrecognized extended
//! `route_type` rather than dropping the route.

/// The mode a graph edge (or an entire mode-graph) belongs to.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(into = "String", try_from = "String"))]
pub enum Mode {
    Tram,
    Subway,
    Rail,
    Bus,
    Ferry,
    CableTram,
    AerialLift,
    Funicular,
    Trolleybus,
    Monorail,
    /// Unrecognized GTFS `route_type` integer, preserved verbatim.
    Other(u16),
    Walking,
    Bike,
}

impl Mode {
    /// Map a raw GTFS `route_type` integer onto a `Mode`.
    ///
    /// Unknown integers become `Mode::Other(n)` rather than being dropped,
    /// per the GTFS loader's contract.
    pub fn from_route_type(route_type: i32) -> Mode {
        match route_type {
            0 => Mode::Tram,
            1 => Mode::Subway,
            2 => Mode::Rail,
            3 => Mode::Bus,
            4 => Mode::Ferry,
            5 => Mode::CableTram,
            6 => Mode::AerialLift,
            7 => Mode::Funicular,
            11 => Mode::Trolleybus,
            12 => Mode::Monorail,
            n => Mode::Other(n.max(0) as u16),
        }
    }

    /// Canonical wire/label form, e.g. `"bus"` or `"route_type_900"`.
    pub fn label(self) -> String {
        match self {
            Mode::Tram => "tram".to_string(),
            Mode::Subway => "subway".to_string(),
            Mode::Rail => "rail".to_string(),
            Mode::Bus => "bus".to_string(),
            Mode::Ferry => "ferry".to_string(),
            Mode::CableTram => "cable_tram".to_string(),
            Mode::AerialLift => "aerial_lift".to_string(),
            Mode::Funicular => "funicular".to_string(),
            Mode::Trolleybus => "trolleybus".to_string(),
            Mode::Monorail => "monorail".to_string(),
            Mode::Other(n) => format!("route_type_{n}"),
            Mode::Walking => "walking".to_string(),
            Mode::Bike => "bike".to_string(),
        }
    }

    /// `true` for the two synthesized non-transit modes.
    pub fn is_foot_or_bike(self) -> bool {
        matches!(self, Mode::Walking | Mode::Bike)
    }

    fn parse(label: &str) -> Option<Mode> {
        Some(match label {
            "tram" => Mode::Tram,
            "subway" => Mode::Subway,
            "rail" => Mode::Rail,
            "bus" => Mode::Bus,
            "ferry" => Mode::Ferry,
            "cable_tram" => Mode::CableTram,
            "aerial_lift" => Mode::AerialLift,
            "funicular" => Mode::Funicular,
            "trolleybus" => Mode::Trolleybus,
            "monorail" => Mode::Monorail,
            "walking" => Mode::Walking,
            "bike" => Mode::Bike,
            other => {
                let n: u16 = other.strip_prefix("route_type_")?.parse().ok()?;
                Mode::Other(n)
            }
        })
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> String {
        mode.label()
    }
}

impl TryFrom<String> for Mode {
    type Error = String;
    fn try_from(value: String) -> Result<Mode, String> {
        Mode::parse(&value).ok_or_else(|| format!("unrecognized transport mode label {value:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_route_types() {
        for rt in [0, 1, 2, 3, 4, 5, 6, 7, 11, 12] {
            let mode = Mode::from_route_type(rt);
            let parsed = Mode::parse(&mode.label()).unwrap();
            assert_eq!(mode, parsed);
        }
    }

    #[test]
    fn unknown_route_type_keeps_integer() {
        let mode = Mode::from_route_type(900);
        assert_eq!(mode.label(), "route_type_900");
        assert_eq!(Mode::parse("route_type_900"), Some(mode));
    }

    #[test]
    fn foot_and_bike_are_not_transit() {
        assert!(Mode::Walking.is_foot_or_bike());
        assert!(Mode::Bike.is_foot_or_bike());
        assert!(!Mode::Bus.is_foot_or_bike());
    }
}
