//! Reads an OSM PBF file and hands its ways with resolved node locations to
//! a [`WayConsumer`].

use crate::bend::WayConsumer;
use crate::error::{Error, Result};
use crate::geo::GeoPoint;
use crate::ids::{NodeLocations, NodeLocationsBuilder};
use crate::osmpbf::{self, build_block_index, read_block, BlockIndex, BlockType};
use crate::parallel::parallel_process;
use crate::stats::Stats;
use crate::way::{Node, Tags, Way};

use itertools::Itertools;
use log::{debug, info, warn};
use pbr::ProgressBar;

use std::convert::TryFrom;
use std::io::{self, Write};
use std::str;

// Coordinates in PBF are given in nanodegrees
const NANODEGREES_PER_FIXED_UNIT: i64 = 100;

fn progress_bar(len: usize, message: &str, show: bool) -> ProgressBar<Box<dyn Write>> {
    let out: Box<dyn Write> = if show {
        Box::new(io::stderr())
    } else {
        Box::new(io::sink())
    };
    let mut pb = ProgressBar::on(out, len as u64);
    pb.message(message);
    pb
}

fn to_fixed(offset: i64, granularity: i32, value: i64) -> Result<i32> {
    i64::from(granularity)
        .checked_mul(value)
        .and_then(|nano| nano.checked_add(offset))
        .and_then(|nano| i32::try_from(nano / NANODEGREES_PER_FIXED_UNIT).ok())
        .ok_or_else(|| Error::InvalidData(format!("coordinate {} out of range", value)))
}

/// Adds a delta coded value to `acc`.
fn add_delta(acc: i64, delta: i64) -> Result<i64> {
    acc.checked_add(delta)
        .ok_or_else(|| Error::InvalidData(format!("delta {} overflows {}", delta, acc)))
}

/// Decodes ids and fixed point locations of all nodes in a block.
fn decode_node_locations(block: &osmpbf::PrimitiveBlock) -> Result<Vec<(i64, i32, i32)>> {
    let granularity = block.granularity.unwrap_or(100);
    let lat_offset = block.lat_offset.unwrap_or(0);
    let lon_offset = block.lon_offset.unwrap_or(0);

    let mut result = Vec::new();
    for group in &block.primitivegroup {
        for node in &group.nodes {
            result.push((
                node.id,
                to_fixed(lat_offset, granularity, node.lat)?,
                to_fixed(lon_offset, granularity, node.lon)?,
            ));
        }

        if let Some(dense) = &group.dense {
            if dense.id.len() != dense.lat.len() || dense.id.len() != dense.lon.len() {
                return Err(Error::InvalidData(
                    "dense nodes with different numbers of ids and coordinates".into(),
                ));
            }
            let (mut id, mut lat, mut lon) = (0, 0, 0);
            for i in 0..dense.id.len() {
                id = add_delta(id, dense.id[i])?;
                lat = add_delta(lat, dense.lat[i])?;
                lon = add_delta(lon, dense.lon[i])?;
                result.push((
                    id,
                    to_fixed(lat_offset, granularity, lat)?,
                    to_fixed(lon_offset, granularity, lon)?,
                ));
            }
        }
    }
    Ok(result)
}

fn lookup<'a>(strings: &[&'a str], idx: u32) -> Result<&'a str> {
    strings
        .get(idx as usize)
        .copied()
        .ok_or_else(|| Error::InvalidData(format!("string index {} out of range", idx)))
}

fn resolve_location(locations: &NodeLocations, id: i64) -> Option<GeoPoint> {
    if id < 0 {
        return None;
    }
    locations.get(id as u64)
}

/// Decodes all ways of a block and resolves the locations of their nodes.
///
/// Ways referencing a node without known location are skipped.
fn resolve_ways(
    block: &osmpbf::PrimitiveBlock,
    locations: &NodeLocations,
) -> Result<(Vec<Way>, Stats)> {
    let strings = block
        .stringtable
        .s
        .iter()
        .map(|s| str::from_utf8(s))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut result = Vec::new();
    let mut stats = Stats::default();
    for group in &block.primitivegroup {
        for pbf_way in &group.ways {
            stats.num_ways += 1;
            if pbf_way.keys.len() != pbf_way.vals.len() {
                return Err(Error::InvalidData(format!(
                    "way {} has different numbers of tag keys and values",
                    pbf_way.id
                )));
            }
            let mut tags = Tags::new();
            for (&k, &v) in pbf_way.keys.iter().zip(&pbf_way.vals) {
                tags.insert(lookup(&strings, k)?, lookup(&strings, v)?);
            }

            let mut nodes = Vec::with_capacity(pbf_way.refs.len());
            let mut num_unresolved = 0;
            let mut node_ref = 0;
            for &delta in &pbf_way.refs {
                node_ref = add_delta(node_ref, delta)?;
                match resolve_location(locations, node_ref) {
                    Some(location) => nodes.push(Node::new(node_ref, location)),
                    None => num_unresolved += 1,
                }
            }

            if num_unresolved > 0 {
                debug!(
                    "Skipping way {}: {} node(s) without location",
                    pbf_way.id, num_unresolved
                );
                stats.num_unresolved_node_refs += num_unresolved;
                stats.num_skipped_ways += 1;
                continue;
            }
            result.push(Way::new(pbf_way.id, nodes, tags));
        }
    }
    Ok((result, stats))
}

fn index_node_locations(
    data: &[u8],
    blocks: Vec<BlockIndex>,
    show_progress: bool,
    stats: &mut Stats,
) -> Result<NodeLocations> {
    let mut builder = NodeLocationsBuilder::new();
    let mut pb = progress_bar(blocks.len(), "Indexing node locations...", show_progress);

    parallel_process(
        blocks.into_iter(),
        |idx| -> Result<Vec<(i64, i32, i32)>> {
            let block: osmpbf::PrimitiveBlock = read_block(data, &idx)?;
            decode_node_locations(&block)
        },
        |nodes| -> Result<()> {
            for (id, lat, lon) in nodes? {
                stats.num_nodes += 1;
                if id < 0 {
                    warn!("Ignoring node with negative id {}", id);
                    stats.num_invalid_node_ids += 1;
                    continue;
                }
                builder.insert(id as u64, lat, lon);
            }
            pb.inc();
            Ok(())
        },
    )?;
    pb.finish();

    info!("Building node location index...");
    let locations = builder.build();
    info!("Node location index built: {} nodes.", locations.len());
    Ok(locations)
}

fn process_ways<C: WayConsumer>(
    data: &[u8],
    blocks: Vec<BlockIndex>,
    locations: &NodeLocations,
    consumer: &mut C,
    show_progress: bool,
    stats: &mut Stats,
) -> Result<()> {
    let mut pb = progress_bar(blocks.len(), "Processing ways...", show_progress);

    parallel_process(
        blocks.into_iter(),
        |idx| -> Result<(Vec<Way>, Stats)> {
            let block: osmpbf::PrimitiveBlock = read_block(data, &idx)?;
            resolve_ways(&block, locations)
        },
        |ways| -> Result<()> {
            let (ways, block_stats) = ways?;
            *stats += block_stats;
            for way in &ways {
                consumer.process_way(way);
            }
            pb.inc();
            Ok(())
        },
    )?;
    pb.finish();

    info!("Ways processed.");
    Ok(())
}

/// Reads all ways of the OSM PBF `data` and calls `consumer` for each of
/// them in file order.
///
/// Node locations are resolved through an in-memory index of all nodes in the
/// file. Relations are ignored.
pub fn process_pbf<C: WayConsumer>(
    data: &[u8],
    consumer: &mut C,
    show_progress: bool,
) -> Result<Stats> {
    info!("Building index of PBF blocks...");
    let (block_index, num_skipped_blocks) = build_block_index(data);

    let mut pbf_header = Vec::new();
    let mut pbf_nodes = Vec::new();
    let mut pbf_ways = Vec::new();
    let groups = block_index.into_iter().group_by(|b| b.block_type);
    for (block_type, blocks) in &groups {
        match block_type {
            BlockType::Header => pbf_header.extend(blocks),
            BlockType::Nodes | BlockType::DenseNodes => pbf_nodes.extend(blocks),
            BlockType::Ways => pbf_ways.extend(blocks),
            BlockType::Relations | BlockType::Changesets => {
                debug!("Ignoring {} {:?} block(s)", blocks.count(), block_type)
            }
        }
    }
    info!("PBF block index built.");

    if pbf_header.len() != 1 {
        return Err(Error::InvalidData(format!(
            "Require exactly one header block, but found {}",
            pbf_header.len()
        )));
    }
    let header: osmpbf::HeaderBlock = read_block(data, &pbf_header[0])?;
    osmpbf::check_required_features(&header)?;
    if let Some(program) = &header.writingprogram {
        debug!("Input written by {}", program);
    }

    let mut stats = Stats {
        num_skipped_blocks,
        ..Stats::default()
    };
    let locations = index_node_locations(data, pbf_nodes, show_progress, &mut stats)?;
    process_ways(
        data,
        pbf_ways,
        &locations,
        consumer,
        show_progress,
        &mut stats,
    )?;
    Ok(stats)
}
