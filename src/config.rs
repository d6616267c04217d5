//! Validated settings of the bend detection, and the JSON configuration file
//! they can be loaded from.

use crate::error::{Error, Result};

use ahash::{AHashMap, AHashSet};
use serde::Deserialize;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Values of the `highway` tag accepted by default.
pub const DEFAULT_HIGHWAY_TAGS: &[&str] = &["trunk", "primary", "secondary", "tertiary"];

/// Tags which exclude a way by default.
pub const DEFAULT_BLACKLISTED_TAGS: &[(&str, &str)] = &[("oneway", "yes"), ("junction", "roundabout")];

/// Default radius in meters in which neighboring nodes are considered.
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 50.0;

/// Default angle in degrees below which a node is a dangerous bend.
pub const DEFAULT_ANGLE_THRESHOLD: f64 = 135.0;

/// Immutable configuration of a [`BendDetector`](crate::BendDetector).
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) highway_tags: AHashSet<String>,
    // key -> blacklisted values
    pub(crate) blacklisted_tags: AHashMap<String, AHashSet<String>>,
    pub(crate) distance_threshold: f64,
    // radians
    pub(crate) angle_threshold: f64,
}

fn blacklist_from<K, V>(tags: impl IntoIterator<Item = (K, V)>) -> AHashMap<String, AHashSet<String>>
where
    K: Into<String>,
    V: Into<String>,
{
    let mut result: AHashMap<String, AHashSet<String>> = AHashMap::new();
    for (key, value) in tags {
        result.entry(key.into()).or_default().insert(value.into());
    }
    result
}

impl Config {
    /// Creates a new configuration.
    ///
    /// `distance_threshold` is given in meters, `angle_threshold` in degrees.
    /// Fails if no highway tag is given or if one of the thresholds is out of
    /// range.
    pub fn new<H, B, S>(
        highway_tags: H,
        blacklisted_tags: B,
        distance_threshold: f64,
        angle_threshold: f64,
    ) -> Result<Self>
    where
        H: IntoIterator<Item = S>,
        B: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let highway_tags: AHashSet<String> = highway_tags.into_iter().map(Into::into).collect();
        if highway_tags.is_empty() {
            return Err(Error::EmptyHighwayTags);
        }
        if !distance_threshold.is_finite() || distance_threshold <= 0.0 {
            return Err(Error::InvalidDistanceThreshold(distance_threshold));
        }
        if !angle_threshold.is_finite() || angle_threshold <= 0.0 || angle_threshold >= 180.0 {
            return Err(Error::InvalidAngleThreshold(angle_threshold));
        }

        Ok(Self {
            highway_tags,
            blacklisted_tags: blacklist_from(blacklisted_tags),
            distance_threshold,
            angle_threshold: angle_threshold.to_radians(),
        })
    }

    pub fn highway_tags(&self) -> impl Iterator<Item = &str> {
        self.highway_tags.iter().map(String::as_str)
    }

    pub fn blacklisted_tags(&self) -> impl Iterator<Item = (&str, &str)> {
        self.blacklisted_tags
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// Distance threshold in meters
    pub fn distance_threshold(&self) -> f64 {
        self.distance_threshold
    }

    /// Angle threshold in radians
    pub fn angle_threshold(&self) -> f64 {
        self.angle_threshold
    }

    pub(crate) fn is_highway(&self, value: &str) -> bool {
        self.highway_tags.contains(value)
    }

    pub(crate) fn is_blacklisted(&self, key: &str, value: &str) -> bool {
        self.blacklisted_tags
            .get(key)
            .map_or(false, |values| values.contains(value))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            highway_tags: DEFAULT_HIGHWAY_TAGS.iter().map(|s| s.to_string()).collect(),
            blacklisted_tags: blacklist_from(DEFAULT_BLACKLISTED_TAGS.iter().copied()),
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            angle_threshold: DEFAULT_ANGLE_THRESHOLD.to_radians(),
        }
    }
}

/// A `key=value` pair excluding a way, as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlacklistedTag {
    pub key: String,
    pub value: String,
}

impl From<(String, String)> for BlacklistedTag {
    fn from((key, value): (String, String)) -> Self {
        Self { key, value }
    }
}

/// Contents of a JSON config file.
///
/// ```json
/// {
///   "input_file": "west.osm.pbf",
///   "output_file": "result.json",
///   "highway_tags": ["trunk", "primary", "secondary", "tertiary"],
///   "blacklisted_tags": [{"key": "oneway", "value": "yes"}],
///   "distance_threshold": 50,
///   "angle_threshold": 135
/// }
/// ```
///
/// Missing settings take their default values. Unknown fields are rejected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub input_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub highway_tags: Vec<String>,
    pub blacklisted_tags: Vec<BlacklistedTag>,
    /// meters
    pub distance_threshold: f64,
    /// degrees
    pub angle_threshold: f64,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            input_file: None,
            output_file: None,
            highway_tags: DEFAULT_HIGHWAY_TAGS.iter().map(|s| s.to_string()).collect(),
            blacklisted_tags: DEFAULT_BLACKLISTED_TAGS
                .iter()
                .map(|(k, v)| BlacklistedTag {
                    key: k.to_string(),
                    value: v.to_string(),
                })
                .collect(),
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            angle_threshold: DEFAULT_ANGLE_THRESHOLD,
        }
    }
}

impl ConfigFile {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Validates the settings of the detection.
    pub fn to_config(&self) -> Result<Config> {
        Config::new(
            self.highway_tags.iter().cloned(),
            self.blacklisted_tags
                .iter()
                .map(|tag| (tag.key.clone(), tag.value.clone())),
            self.distance_threshold,
            self.angle_threshold,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default() {
        let config = Config::default();
        let mut tags: Vec<_> = config.highway_tags().collect();
        tags.sort_unstable();
        assert_eq!(tags, vec!["primary", "secondary", "tertiary", "trunk"]);
        assert!(config.is_blacklisted("oneway", "yes"));
        assert!(config.is_blacklisted("junction", "roundabout"));
        assert!(!config.is_blacklisted("oneway", "no"));
        assert!(!config.is_blacklisted("yes", "oneway"));
        assert_eq!(config.distance_threshold(), 50.0);
        assert!((config.angle_threshold() - 0.75 * std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn test_several_values_of_one_key() {
        let config = Config::new(
            vec!["primary"],
            vec![("access", "no"), ("access", "private")],
            50.0,
            135.0,
        )
        .unwrap();
        assert!(config.is_blacklisted("access", "no"));
        assert!(config.is_blacklisted("access", "private"));
        assert!(!config.is_blacklisted("access", "yes"));
        let mut tags: Vec<_> = config.blacklisted_tags().collect();
        tags.sort_unstable();
        assert_eq!(tags, vec![("access", "no"), ("access", "private")]);
    }

    #[test]
    fn test_angle_is_converted_to_radians() {
        let config = Config::new(vec!["primary"], vec![], 10.0, 90.0).unwrap();
        assert!((config.angle_threshold() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!(config.is_highway("primary"));
        assert!(!config.is_highway("residential"));
    }

    #[test]
    fn test_empty_highway_tags() {
        let err = Config::new(Vec::<&str>::new(), vec![], 50.0, 135.0).unwrap_err();
        assert!(matches!(err, Error::EmptyHighwayTags));
    }

    #[test]
    fn test_invalid_distance_threshold() {
        for distance in [0.0, -1.0, f64::NAN, f64::INFINITY].iter() {
            let err = Config::new(vec!["primary"], vec![], *distance, 135.0).unwrap_err();
            assert!(matches!(err, Error::InvalidDistanceThreshold(_)));
        }
    }

    #[test]
    fn test_invalid_angle_threshold() {
        for angle in [0.0, -10.0, 180.0, 200.0, f64::NAN].iter() {
            let err = Config::new(vec!["primary"], vec![], 50.0, *angle).unwrap_err();
            assert!(matches!(err, Error::InvalidAngleThreshold(_)));
        }
    }

    #[test]
    fn test_config_file() {
        let json = r#"{
            "input_file": "west.osm.pbf",
            "output_file": "result.json",
            "highway_tags": ["primary", "secondary"],
            "blacklisted_tags": [
                {"key": "oneway", "value": "yes"},
                {"key": "access", "value": "no"}
            ],
            "distance_threshold": 40,
            "angle_threshold": 120.5
        }"#;
        let file = ConfigFile::from_reader(json.as_bytes()).unwrap();
        assert_eq!(file.input_file, Some(PathBuf::from("west.osm.pbf")));
        assert_eq!(file.output_file, Some(PathBuf::from("result.json")));

        let config = file.to_config().unwrap();
        let mut tags: Vec<_> = config.highway_tags().collect();
        tags.sort_unstable();
        assert_eq!(tags, vec!["primary", "secondary"]);
        assert!(config.is_blacklisted("access", "no"));
        assert!(!config.is_blacklisted("junction", "roundabout"));
        assert_eq!(config.distance_threshold(), 40.0);
        assert!((config.angle_threshold() - 120.5_f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn test_config_file_defaults() {
        let file = ConfigFile::from_reader(r#"{"angle_threshold": 90}"#.as_bytes()).unwrap();
        assert_eq!(file.input_file, None);
        assert_eq!(file.highway_tags, ConfigFile::default().highway_tags);
        assert_eq!(file.blacklisted_tags.len(), 2);
        assert_eq!(file.distance_threshold, DEFAULT_DISTANCE_THRESHOLD);
        assert_eq!(file.angle_threshold, 90.0);
    }

    #[test]
    fn test_invalid_config_file() {
        let unknown = ConfigFile::from_reader(r#"{"distance": 50}"#.as_bytes()).unwrap_err();
        assert!(matches!(unknown, Error::ConfigFile(_)));

        let bad_tag = r#"{"blacklisted_tags": [{"key": "oneway"}]}"#;
        assert!(matches!(
            ConfigFile::from_reader(bad_tag.as_bytes()),
            Err(Error::ConfigFile(_))
        ));

        let file = ConfigFile::from_reader(r#"{"highway_tags": []}"#.as_bytes()).unwrap();
        assert!(matches!(file.to_config(), Err(Error::EmptyHighwayTags)));
    }
}
