//! Store layout
//!
//! ```text
//! pioneers/<key>            = { name, page, status }
//! liveStatus/totalPioneers  = integer
//! liveStatus/totalCapacity  = integer
//! siteContent/roadmap/<key> = { title, description, icon }
//! siteContent/serverStatus  = { status, message }
//! ```

use pioneer_store::StorePath;

pub fn pioneers() -> StorePath {
    StorePath::from_static("pioneers")
}

pub fn live_status() -> StorePath {
    StorePath::from_static("liveStatus")
}

/// Written only by the aggregate deriver
pub fn total_pioneers() -> StorePath {
    StorePath::from_static("liveStatus/totalPioneers")
}

pub fn total_capacity() -> StorePath {
    StorePath::from_static("liveStatus/totalCapacity")
}

pub fn roadmap() -> StorePath {
    StorePath::from_static("siteContent/roadmap")
}

pub fn server_status() -> StorePath {
    StorePath::from_static("siteContent/serverStatus")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_counter_is_outside_pioneers() {
        assert!(!pioneers().overlaps(&total_pioneers()));
        assert!(live_status().contains(&total_pioneers()));
        assert!(live_status().contains(&total_capacity()));
        assert_eq!(roadmap().to_string(), "siteContent/roadmap");
    }
}
