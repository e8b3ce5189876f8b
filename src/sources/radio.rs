//! Directorio fijo de estaciones de radio por internet.

/// Estación de radio con stream directo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioStation {
    pub name: &'static str,
    pub url: &'static str,
}

/// Estaciones disponibles para el comando /radio
pub const STATIONS: &[RadioStation] = &[
    RadioStation {
        name: "Chill FM",
        url: "https://stream.chill.fm/stream",
    },
    RadioStation {
        name: "Jazz FM",
        url: "https://stream.jazzfm.com/stream",
    },
    RadioStation {
        name: "Pop Hits",
        url: "https://stream.pophits.fm/stream",
    },
];

/// Busca una estación por nombre (sin distinguir mayúsculas)
pub fn find_station(name: &str) -> Option<RadioStation> {
    STATIONS
        .iter()
        .find(|station| station.name.eq_ignore_ascii_case(name))
        .copied()
}

/// Listado de estaciones para mostrar al usuario
pub fn available_stations() -> String {
    STATIONS
        .iter()
        .map(|station| format!("**{}**", station.name))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_station_case_insensitive() {
        assert_eq!(find_station("jazz fm"), Some(STATIONS[1]));
        assert_eq!(find_station("CHILL FM"), Some(STATIONS[0]));
        assert_eq!(find_station("Pop Hits"), Some(STATIONS[2]));
    }

    #[test]
    fn test_find_station_unknown() {
        assert_eq!(find_station("Metal FM"), None);
    }

    #[test]
    fn test_available_stations_lists_all() {
        let listing = available_stations();
        for station in STATIONS {
            assert!(listing.contains(station.name));
        }
    }
}
