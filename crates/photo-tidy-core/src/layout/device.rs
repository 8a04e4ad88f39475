use std::collections::BTreeMap;
use std::path::{Component, Path};

/// Device labels and the path fragments that identify them.
///
/// Labels are kept in lexicographic order and fragments in configured order,
/// so when several labels could match a path the lexicographically first one
/// is chosen.
#[derive(Debug, Clone, Default)]
pub struct DeviceNameMap {
    devices: Vec<(String, Vec<String>)>,
}

impl DeviceNameMap {
    pub fn new(device_names: &BTreeMap<String, Vec<String>>) -> Self {
        Self {
            devices: device_names
                .iter()
                .map(|(label, fragments)| (label.clone(), fragments.clone()))
                .collect(),
        }
    }

    /// Label for `source`, or an empty string when nothing matches.
    ///
    /// Absolute fragments (starting with `/`) are tried first as path
    /// prefixes. Then each segment of `source`, in order, is compared against
    /// the plain fragments.
    pub fn resolve(&self, source: &Path) -> &str {
        for (label, fragments) in &self.devices {
            // Component-wise: `/a/phone` matches `/a/phone/x.jpg` but not
            // `/a/phone2/x.jpg`, unlike a plain string prefix.
            let prefix_match = fragments
                .iter()
                .filter(|f| f.starts_with('/'))
                .any(|f| source.starts_with(f));
            if prefix_match {
                return label;
            }
        }

        for segment in source.components() {
            let Component::Normal(segment) = segment else {
                continue;
            };
            for (label, fragments) in &self.devices {
                if fragments.iter().any(|f| segment == f.as_str()) {
                    return label;
                }
            }
        }

        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: Vec<(&str, Vec<&str>)>) -> DeviceNameMap {
        let names: BTreeMap<String, Vec<String>> = entries
            .into_iter()
            .map(|(label, fragments)| {
                (
                    label.to_string(),
                    fragments.iter().map(|f| f.to_string()).collect(),
                )
            })
            .collect();
        DeviceNameMap::new(&names)
    }

    #[test]
    fn test_segment_match() {
        let devices = map(vec![("alice", vec!["phone"])]);
        assert_eq!(devices.resolve(Path::new("/a/phone")), "alice");
    }

    #[test]
    fn test_absolute_prefix_match() {
        let devices = map(vec![("alice", vec!["/a/phone"])]);
        assert_eq!(devices.resolve(Path::new("/a/phone")), "alice");
    }

    #[test]
    fn test_absolute_prefix_picks_owning_label() {
        let devices = map(vec![("alice", vec!["/a/phone"]), ("bob", vec!["/b/phone"])]);
        assert_eq!(devices.resolve(Path::new("/a/phone/b")), "alice");
        assert_eq!(devices.resolve(Path::new("/b/phone/DCIM/x.jpg")), "bob");
    }

    #[test]
    fn test_no_match_is_empty() {
        let devices = map(vec![("alice", vec!["/a/phone"])]);
        assert_eq!(devices.resolve(Path::new("/foo/bar/baz")), "");
        assert_eq!(DeviceNameMap::default().resolve(Path::new("/a/phone")), "");
    }

    #[test]
    fn test_prefix_is_component_wise() {
        let devices = map(vec![("alice", vec!["/a/phone"])]);
        assert_eq!(devices.resolve(Path::new("/a/phone2/x.jpg")), "");
    }

    #[test]
    fn test_prefix_beats_segment() {
        let devices = map(vec![("alice", vec!["camera"]), ("bob", vec!["/media/card"])]);
        assert_eq!(devices.resolve(Path::new("/media/card/camera/x.jpg")), "bob");
    }

    #[test]
    fn test_earliest_segment_wins_then_label_order() {
        let devices = map(vec![("zed", vec!["DCIM"]), ("amy", vec!["card"]), ("bea", vec!["card"])]);
        assert_eq!(devices.resolve(Path::new("/mnt/card/DCIM/x.jpg")), "amy");
        assert_eq!(devices.resolve(Path::new("/mnt/DCIM/card/x.jpg")), "zed");
    }
}
