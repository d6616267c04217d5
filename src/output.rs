//! Writers for the detected dangerous bends.

use crate::bend::Finding;
use crate::geo::GeoPoint;

use serde::Serialize;
use serde_json::json;

use std::io::{self, Write};

/// Output representation of findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One openstreetmap.org link per line
    Links,
    /// Comma separated values with a header line
    Csv,
    /// GeoJSON feature collection of points
    #[value(name = "geojson")]
    GeoJson,
    /// JSON array of locations and links
    Json,
}

#[derive(Serialize)]
struct JsonFinding {
    location: GeoPoint,
    link: String,
}

fn write_json<W: Write>(findings: &[Finding], out: &mut W) -> io::Result<()> {
    let results: Vec<_> = findings
        .iter()
        .map(|finding| JsonFinding {
            location: finding.location,
            link: finding.permalink(),
        })
        .collect();
    serde_json::to_writer_pretty(&mut *out, &results)?;
    writeln!(out)
}

fn write_links<W: Write>(findings: &[Finding], out: &mut W) -> io::Result<()> {
    for finding in findings {
        writeln!(out, "{}", finding.permalink())?;
    }
    Ok(())
}

fn write_csv<W: Write>(findings: &[Finding], out: &mut W) -> io::Result<()> {
    writeln!(out, "node_id,way_id,lat,lon")?;
    for finding in findings {
        writeln!(
            out,
            "{},{},{:.7},{:.7}",
            finding.id, finding.way_id, finding.location.lat, finding.location.lon
        )?;
    }
    Ok(())
}

fn write_geojson<W: Write>(findings: &[Finding], out: &mut W) -> io::Result<()> {
    let features: Vec<_> = findings
        .iter()
        .map(|finding| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [finding.location.lon, finding.location.lat],
                },
                "properties": {
                    "node_id": finding.id,
                    "way_id": finding.way_id,
                    "url": finding.permalink(),
                },
            })
        })
        .collect();
    let collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    serde_json::to_writer_pretty(&mut *out, &collection)?;
    writeln!(out)
}

/// Writes `findings` to `out` in the given `format`.
pub fn write_findings<W: Write>(
    findings: &[Finding],
    format: OutputFormat,
    out: &mut W,
) -> io::Result<()> {
    match format {
        OutputFormat::Links => write_links(findings, out),
        OutputFormat::Csv => write_csv(findings, out),
        OutputFormat::GeoJson => write_geojson(findings, out),
        OutputFormat::Json => write_json(findings, out),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geo::GeoPoint;

    fn findings() -> Vec<Finding> {
        vec![
            Finding {
                id: 42,
                location: GeoPoint::new(52.5, 13.4),
                way_id: 7,
            },
            Finding {
                id: 43,
                location: GeoPoint::new(-1.25, 0.5),
                way_id: 8,
            },
        ]
    }

    fn render(format: OutputFormat) -> String {
        let mut out = Vec::new();
        write_findings(&findings(), format, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_links() {
        assert_eq!(
            render(OutputFormat::Links),
            "https://www.openstreetmap.org/node/42\nhttps://www.openstreetmap.org/node/43\n"
        );
    }

    #[test]
    fn test_csv() {
        assert_eq!(
            render(OutputFormat::Csv),
            "node_id,way_id,lat,lon\n42,7,52.5000000,13.4000000\n43,8,-1.2500000,0.5000000\n"
        );
    }

    #[test]
    fn test_geojson() {
        let value: serde_json::Value = serde_json::from_str(&render(OutputFormat::GeoJson)).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        let features = value["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["geometry"]["coordinates"], json!([13.4, 52.5]));
        assert_eq!(features[1]["properties"]["node_id"], 43);
        assert_eq!(
            features[1]["properties"]["url"],
            "https://www.openstreetmap.org/node/43"
        );
    }

    #[test]
    fn test_json() {
        let value: serde_json::Value = serde_json::from_str(&render(OutputFormat::Json)).unwrap();
        assert_eq!(
            value,
            json!([
                {
                    "location": {"lat": 52.5, "lon": 13.4},
                    "link": "https://www.openstreetmap.org/node/42"
                },
                {
                    "location": {"lat": -1.25, "lon": 0.5},
                    "link": "https://www.openstreetmap.org/node/43"
                }
            ])
        );
        assert!(render(OutputFormat::Json).starts_with("[\n  {\n    \"location\""));
    }

    #[test]
    fn test_no_findings() {
        let mut out = Vec::new();
        write_findings(&[], OutputFormat::Csv, &mut out).unwrap();
        assert_eq!(out, b"node_id,way_id,lat,lon\n");

        let mut out = Vec::new();
        write_findings(&[], OutputFormat::Json, &mut out).unwrap();
        assert_eq!(out, b"[]\n");
    }
}
