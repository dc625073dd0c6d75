//! GTFS archive loading, narrowed to a single service date.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use gtfs_structures::{Gtfs, RouteType};
use log::{info, warn};
use tg_core::Mode;

use crate::error::{FeedError, FeedResult};

/// A transit stop pulled from the feed. Stops with no coordinates are
/// dropped rather than carried forward as `NaN`.
#[derive(Debug, Clone)]
pub struct StopRecord {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// One scheduled hop between two consecutive stops of a trip.
#[derive(Debug, Clone)]
pub struct TripSegment {
    pub trip_id: String,
    pub route_id: String,
    pub route_name: String,
    pub mode: Mode,
    pub from_stop: String,
    pub to_stop: String,
    pub departure_time: u32,
    pub arrival_time: u32,
}

/// The slice of a GTFS feed the graph builder needs: stops narrowed to a
/// single service date, and the trip segments that run on it.
#[derive(Debug, Clone)]
pub struct LoadedFeed {
    pub stops: Vec<StopRecord>,
    pub segments: Vec<TripSegment>,
}

/// Load a GTFS archive (zip or directory) and narrow it to the earliest
/// date on which any trip actually runs.
///
/// If narrowing leaves no stops — a feed whose calendar data doesn't line
/// up with any trip — this falls back to every trip in the feed
/// regardless of service date. If that still yields no stops, the
/// archive is rejected as invalid.
pub fn load_feed<P: AsRef<Path>>(path: P) -> FeedResult<LoadedFeed> {
    let path = path.as_ref();
    let gtfs = Gtfs::new(path.to_string_lossy().as_ref())?;

    let narrowed = earliest_service_date(&gtfs).map(|date| narrow_to_date(&gtfs, date));

    let feed = match narrowed {
        Some(feed) if !feed.stops.is_empty() => feed,
        _ => {
            warn!(
                "GTFS feed at {} had no stops after date narrowing; falling back to the full feed",
                path.display()
            );
            build_feed(&gtfs, None)
        }
    };

    if feed.stops.is_empty() {
        return Err(FeedError::Invalid {
            path: path.display().to_string(),
        });
    }

    info!(
        "loaded GTFS feed at {}: {} stops, {} segments",
        path.display(),
        feed.stops.len(),
        feed.segments.len()
    );
    Ok(feed)
}

/// The earliest date any service actually runs, found by asking
/// [`Gtfs::trip_days`] for every `service_id` relative to the earliest
/// calendar/calendar_dates anchor and taking the smallest offset.
fn earliest_service_date(gtfs: &Gtfs) -> Option<NaiveDate> {
    let anchor = gtfs
        .calendar
        .values()
        .map(|c| c.start_date)
        .chain(
            gtfs.calendar_dates
                .values()
                .flat_map(|dates| dates.iter().map(|d| d.date)),
        )
        .min()?;

    let service_ids: HashSet<&str> = gtfs
        .calendar
        .keys()
        .map(String::as_str)
        .chain(gtfs.calendar_dates.keys().map(String::as_str))
        .collect();

    let min_offset = service_ids
        .into_iter()
        .flat_map(|service_id| gtfs.trip_days(service_id, anchor))
        .min()?;

    anchor.checked_add_signed(chrono::Duration::days(min_offset as i64))
}

/// Which `service_id`s are active on `date`, found by re-querying
/// `trip_days` anchored at `date` itself and checking for a same-day hit.
fn active_services_on(gtfs: &Gtfs, date: NaiveDate) -> HashSet<String> {
    gtfs.calendar
        .keys()
        .chain(gtfs.calendar_dates.keys())
        .filter(|service_id| gtfs.trip_days(service_id.as_str(), date).contains(&0))
        .cloned()
        .collect()
}

fn narrow_to_date(gtfs: &Gtfs, date: NaiveDate) -> LoadedFeed {
    let active = active_services_on(gtfs, date);
    build_feed(gtfs, Some(&active))
}

fn build_feed(gtfs: &Gtfs, active_services: Option<&HashSet<String>>) -> LoadedFeed {
    let mut used_stops: HashSet<&str> = HashSet::new();
    let mut segments = Vec::new();

    for trip in gtfs.trips.values() {
        if let Some(active) = active_services
            && !active.contains(&trip.service_id)
        {
            continue;
        }
        let Some(route) = gtfs.routes.get(&trip.route_id) else {
            continue;
        };
        let mode = Mode::from_route_type(route_type_to_route_code(&route.route_type));
        let route_name = route
            .short_name
            .clone()
            .or_else(|| route.long_name.clone())
            .unwrap_or_else(|| route.id.clone());

        let mut stop_times: Vec<&gtfs_structures::StopTime> = trip.stop_times.iter().collect();
        stop_times.sort_by_key(|st| st.stop_sequence);

        for pair in stop_times.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let (Some(departure_time), Some(arrival_time)) =
                (from.departure_time, to.arrival_time)
            else {
                continue;
            };
            used_stops.insert(from.stop.id.as_str());
            used_stops.insert(to.stop.id.as_str());
            segments.push(TripSegment {
                trip_id: trip.id.clone(),
                route_id: trip.route_id.clone(),
                route_name: route_name.clone(),
                mode,
                from_stop: from.stop.id.clone(),
                to_stop: to.stop.id.clone(),
                departure_time,
                arrival_time,
            });
        }
    }

    let stops = gtfs
        .stops
        .values()
        .filter(|stop| used_stops.contains(stop.id.as_str()))
        .filter_map(|stop| {
            let lat = stop.latitude?;
            let lon = stop.longitude?;
            Some(StopRecord {
                id: stop.id.clone(),
                name: stop.name.clone().unwrap_or_else(|| stop.id.clone()),
                lat,
                lon,
            })
        })
        .collect();

    LoadedFeed { stops, segments }
}

fn route_type_to_route_code(route_type: &RouteType) -> i32 {
    match route_type {
        RouteType::Tramway => 0,
        RouteType::Subway => 1,
        RouteType::Rail => 2,
        RouteType::Bus => 3,
        RouteType::Ferry => 4,
        RouteType::CableCar => 5,
        RouteType::Gondola => 6,
        RouteType::Funicular => 7,
        RouteType::Coach => 200,
        RouteType::Air => 1100,
        RouteType::Taxi => 1500,
        RouteType::Other(n) => *n as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &std::path::Path, name: &str, contents: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    /// Builds a minimal two-stop, single-route GTFS directory feed with one
    /// weekday calendar, running today and tomorrow.
    fn write_fixture(dir: &std::path::Path, start: NaiveDate, end: NaiveDate) {
        write_file(dir, "agency.txt", "agency_id,agency_name,agency_url,agency_timezone\n1,Test Agency,http://example.com,Europe/Warsaw\n");
        write_file(
            dir,
            "stops.txt",
            "stop_id,stop_name,stop_lat,stop_lon\nA,Stop A,50.06,19.94\nB,Stop B,50.07,19.95\n",
        );
        write_file(
            dir,
            "routes.txt",
            "route_id,agency_id,route_short_name,route_long_name,route_type\nR1,1,1,Main Line,3\n",
        );
        write_file(
            dir,
            "trips.txt",
            "route_id,service_id,trip_id\nR1,WEEKDAY,T1\n",
        );
        write_file(
            dir,
            "stop_times.txt",
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\nT1,08:00:00,08:00:00,A,1\nT1,08:05:00,08:05:00,B,2\n",
        );
        write_file(
            dir,
            "calendar.txt",
            &format!(
                "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\nWEEKDAY,1,1,1,1,1,1,1,{},{}\n",
                start.format("%Y%m%d"),
                end.format("%Y%m%d"),
            ),
        );
    }

    #[test]
    fn loads_stops_and_segments_from_a_tiny_feed() {
        let dir = tempfile::tempdir().unwrap();
        let start = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 12).unwrap();
        write_fixture(dir.path(), start, end);

        let feed = load_feed(dir.path()).unwrap();
        assert_eq!(feed.stops.len(), 2);
        assert_eq!(feed.segments.len(), 1);
        let segment = &feed.segments[0];
        assert_eq!(segment.from_stop, "A");
        assert_eq!(segment.to_stop, "B");
        assert_eq!(segment.mode, Mode::Bus);
        assert_eq!(segment.departure_time, 8 * 3600);
        assert_eq!(segment.arrival_time, 8 * 3600 + 300);
    }

    #[test]
    fn falls_back_to_the_full_feed_when_narrowing_finds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        // A calendar window entirely in the past relative to everything
        // `trip_days` would compute forward from still keeps the trip
        // reachable through the unnarrowed fallback.
        let start = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
        let end = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
        write_fixture(dir.path(), start, end);

        let feed = load_feed(dir.path()).unwrap();
        assert_eq!(feed.stops.len(), 2);
        assert_eq!(feed.segments.len(), 1);
    }

    #[test]
    fn rejects_a_feed_with_no_stops_at_all() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "agency.txt", "agency_id,agency_name,agency_url,agency_timezone\n1,Test Agency,http://example.com,Europe/Warsaw\n");
        write_file(dir.path(), "stops.txt", "stop_id,stop_name,stop_lat,stop_lon\n");
        write_file(
            dir.path(),
            "routes.txt",
            "route_id,agency_id,route_short_name,route_long_name,route_type\n",
        );
        write_file(dir.path(), "trips.txt", "route_id,service_id,trip_id\n");
        write_file(
            dir.path(),
            "stop_times.txt",
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n",
        );
        write_file(
            dir.path(),
            "calendar.txt",
            "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n",
        );

        let err = load_feed(dir.path()).unwrap_err();
        assert!(matches!(err, FeedError::Invalid { .. }));
    }
}
