use std::path::PathBuf;

use clap::Parser;
use dangerous_bend::config::{BlacklistedTag, ConfigFile};
use dangerous_bend::output::OutputFormat;

/// Finds dangerous bends in the road network of an OSM pbf file
#[derive(Debug, Parser)]
#[command(about, version)]
pub struct Args {
    /// Verbose mode (-v, -vv, -vvv, etc.)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Input OSM pbf file [default: input_file of the config file]
    pub input: Option<PathBuf>,

    /// JSON config file; other options override its settings
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output file [default: output_file of the config file, or stdout]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format [default: json with a config file, links otherwise]
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Accepted value of the highway tag, can be repeated
    /// [default: trunk, primary, secondary, tertiary]
    #[arg(long = "highway", value_name = "VALUE")]
    pub highway_tags: Vec<String>,

    /// Tag excluding a way, can be repeated; added to the configured ones
    /// [default: oneway=yes, junction=roundabout]
    #[arg(long = "blacklist", value_name = "KEY=VALUE", value_parser = parse_tag)]
    pub blacklisted_tags: Vec<(String, String)>,

    /// Drop the configured (or default) blacklisted tags
    #[arg(long)]
    pub clear_blacklist: bool,

    /// Radius in meters in which neighboring nodes are considered [default: 50]
    #[arg(long)]
    pub distance: Option<f64>,

    /// Angle in degrees below which a node is reported [default: 135]
    #[arg(long)]
    pub angle: Option<f64>,

    /// Do not show progress bars
    #[arg(long)]
    pub no_progress: bool,
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() && !value.is_empty() => {
            Ok((key.to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

impl Args {
    /// Settings of the run: the config file (or the defaults) with the
    /// command line options applied on top.
    pub fn settings(&self) -> dangerous_bend::Result<ConfigFile> {
        let mut settings = match &self.config {
            Some(path) => ConfigFile::open(path)?,
            None => ConfigFile::default(),
        };

        if let Some(input) = &self.input {
            settings.input_file = Some(input.clone());
        }
        if let Some(output) = &self.output {
            settings.output_file = Some(output.clone());
        }
        if !self.highway_tags.is_empty() {
            settings.highway_tags = self.highway_tags.clone();
        }
        if self.clear_blacklist {
            settings.blacklisted_tags.clear();
        }
        settings
            .blacklisted_tags
            .extend(self.blacklisted_tags.iter().cloned().map(BlacklistedTag::from));
        if let Some(distance) = self.distance {
            settings.distance_threshold = distance;
        }
        if let Some(angle) = self.angle {
            settings.angle_threshold = angle;
        }
        Ok(settings)
    }

    pub fn output_format(&self) -> OutputFormat {
        match (self.format, &self.config) {
            (Some(format), _) => format,
            (None, Some(_)) => OutputFormat::Json,
            (None, None) => OutputFormat::Links,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(&["dangerous-bend", "input.osm.pbf"]).unwrap();
        assert_eq!(args.output_format(), OutputFormat::Links);
        let settings = args.settings().unwrap();
        assert_eq!(settings.input_file, Some(PathBuf::from("input.osm.pbf")));
        assert_eq!(settings.output_file, None);
        let config = settings.to_config().unwrap();
        assert_eq!(config.highway_tags().count(), 4);
        assert_eq!(config.blacklisted_tags().count(), 2);
        assert_eq!(config.distance_threshold(), 50.0);
    }

    #[test]
    fn test_custom_config() {
        let args = Args::try_parse_from(&[
            "dangerous-bend",
            "--highway",
            "residential",
            "--blacklist",
            "access=no",
            "--clear-blacklist",
            "--distance",
            "30",
            "--angle",
            "90",
            "--format",
            "geojson",
            "input.osm.pbf",
        ])
        .unwrap();
        assert_eq!(args.output_format(), OutputFormat::GeoJson);
        let config = args.settings().unwrap().to_config().unwrap();
        assert_eq!(config.highway_tags().collect::<Vec<_>>(), vec!["residential"]);
        assert_eq!(
            config.blacklisted_tags().collect::<Vec<_>>(),
            vec![("access", "no")]
        );
        assert_eq!(config.distance_threshold(), 30.0);
    }

    #[test]
    fn test_config_file_with_overrides() {
        let path = std::env::temp_dir().join(format!(
            "dangerous-bend-args-{}.json",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{
                "input_file": "west.osm.pbf",
                "output_file": "result.json",
                "highway_tags": ["trunk"],
                "blacklisted_tags": [{{"key": "oneway", "value": "yes"}}],
                "distance_threshold": 40,
                "angle_threshold": 120
            }}"#
        )
        .unwrap();
        drop(file);

        let config_path = path.to_string_lossy().into_owned();
        let args = Args::try_parse_from(&[
            "dangerous-bend",
            "--config",
            config_path.as_str(),
            "--blacklist",
            "access=no",
            "--angle",
            "100",
        ])
        .unwrap();
        let settings = args.settings();
        std::fs::remove_file(&path).unwrap();
        let settings = settings.unwrap();

        assert_eq!(args.output_format(), OutputFormat::Json);
        assert_eq!(settings.input_file, Some(PathBuf::from("west.osm.pbf")));
        assert_eq!(settings.output_file, Some(PathBuf::from("result.json")));
        assert_eq!(settings.angle_threshold, 100.0);

        let config = settings.to_config().unwrap();
        assert_eq!(config.highway_tags().collect::<Vec<_>>(), vec!["trunk"]);
        let mut tags: Vec<_> = config.blacklisted_tags().collect();
        tags.sort_unstable();
        assert_eq!(tags, vec![("access", "no"), ("oneway", "yes")]);
        assert_eq!(config.distance_threshold(), 40.0);
    }

    #[test]
    fn test_missing_config_file() {
        let args = Args::try_parse_from(&[
            "dangerous-bend",
            "--config",
            "/nonexistent/dangerous-bend.json",
        ])
        .unwrap();
        assert!(matches!(args.settings(), Err(dangerous_bend::Error::Io(_))));
    }

    #[test]
    fn test_malformed_blacklist() {
        assert!(Args::try_parse_from(&["dangerous-bend", "--blacklist", "oneway", "x.pbf"]).is_err());
        assert!(Args::try_parse_from(&["dangerous-bend", "--blacklist", "=yes", "x.pbf"]).is_err());
    }

    #[test]
    fn test_invalid_angle() {
        let args = Args::try_parse_from(&["dangerous-bend", "--angle", "180", "x.pbf"]).unwrap();
        assert!(args.settings().unwrap().to_config().is_err());
    }
}
