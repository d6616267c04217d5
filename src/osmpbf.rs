//! OSM PBF container: length prefixed blobs of protobuf encoded blocks.
//!
//! Only the parts of the format needed to resolve way geometries are
//! declared. Unknown fields (metadata, relations, ...) are skipped by the
//! decoder.

use crate::error::{Error, Result};

use byteorder::{ByteOrder, NetworkEndian};
use flate2::read::ZlibDecoder;
use log::{info, warn};
use prost::Message;
use rayon::iter::Either;
use rayon::prelude::*;

use std::io::Read;

#[derive(Clone, PartialEq, Message)]
pub struct BlobHeader {
    #[prost(string, required, tag = "1")]
    pub r#type: String,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub indexdata: Option<Vec<u8>>,
    #[prost(int32, required, tag = "3")]
    pub datasize: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct Blob {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub raw: Option<Vec<u8>>,
    #[prost(int32, optional, tag = "2")]
    pub raw_size: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub zlib_data: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct HeaderBlock {
    #[prost(string, repeated, tag = "4")]
    pub required_features: Vec<String>,
    #[prost(string, repeated, tag = "5")]
    pub optional_features: Vec<String>,
    #[prost(string, optional, tag = "16")]
    pub writingprogram: Option<String>,
    #[prost(string, optional, tag = "17")]
    pub source: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PrimitiveBlock {
    #[prost(message, required, tag = "1")]
    pub stringtable: StringTable,
    #[prost(message, repeated, tag = "2")]
    pub primitivegroup: Vec<PrimitiveGroup>,
    #[prost(int32, optional, tag = "17")]
    pub granularity: Option<i32>,
    #[prost(int64, optional, tag = "19")]
    pub lat_offset: Option<i64>,
    #[prost(int64, optional, tag = "20")]
    pub lon_offset: Option<i64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct StringTable {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub s: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PrimitiveGroup {
    #[prost(message, repeated, tag = "1")]
    pub nodes: Vec<Node>,
    #[prost(message, optional, tag = "2")]
    pub dense: Option<DenseNodes>,
    #[prost(message, repeated, tag = "3")]
    pub ways: Vec<Way>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Node {
    #[prost(sint64, required, tag = "1")]
    pub id: i64,
    #[prost(uint32, repeated, packed = "true", tag = "2")]
    pub keys: Vec<u32>,
    #[prost(uint32, repeated, packed = "true", tag = "3")]
    pub vals: Vec<u32>,
    #[prost(sint64, required, tag = "8")]
    pub lat: i64,
    #[prost(sint64, required, tag = "9")]
    pub lon: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct DenseNodes {
    #[prost(sint64, repeated, packed = "true", tag = "1")]
    pub id: Vec<i64>,
    #[prost(sint64, repeated, packed = "true", tag = "8")]
    pub lat: Vec<i64>,
    #[prost(sint64, repeated, packed = "true", tag = "9")]
    pub lon: Vec<i64>,
    #[prost(int32, repeated, packed = "true", tag = "10")]
    pub keys_vals: Vec<i32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Way {
    #[prost(int64, required, tag = "1")]
    pub id: i64,
    #[prost(uint32, repeated, packed = "true", tag = "2")]
    pub keys: Vec<u32>,
    #[prost(uint32, repeated, packed = "true", tag = "3")]
    pub vals: Vec<u32>,
    #[prost(sint64, repeated, packed = "true", tag = "8")]
    pub refs: Vec<i64>,
}

/// Features a reader must understand to interpret the file correctly.
pub const SUPPORTED_FEATURES: &[&str] = &["OsmSchema-V0.6", "DenseNodes"];

/// Checks that all required features of the file are supported.
pub fn check_required_features(header: &HeaderBlock) -> Result<()> {
    match header
        .required_features
        .iter()
        .find(|feature| !SUPPORTED_FEATURES.contains(&feature.as_str()))
    {
        Some(feature) => Err(Error::UnsupportedFeature(feature.clone())),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockType {
    Header,
    Nodes,
    DenseNodes,
    Ways,
    Relations,
    Changesets,
}

impl BlockType {
    /// Decode block type from PrimitiveBlock protobuf message
    ///
    /// This does not decode any fields, it just checks which tags are present
    /// in PrimitiveGroup fields of the message.
    ///
    /// `blob` should contain decompressed data of an OSMData PrimitiveBlock.
    pub fn from_osmdata_blob(mut blob: &[u8]) -> Result<BlockType> {
        const PRIMITIVE_GROUP_TAG: u32 = 2;
        const NODES_TAG: u32 = 1;
        const DENSE_NODES_TAG: u32 = 2;
        const WAYS_TAG: u32 = 3;
        const RELATIONS_TAG: u32 = 4;
        const CHANGESETS_TAG: u32 = 5;

        loop {
            let (key, wire_type) = prost::encoding::decode_key(&mut blob)?;
            if key != PRIMITIVE_GROUP_TAG {
                prost::encoding::skip_field(
                    wire_type,
                    key,
                    &mut blob,
                    prost::encoding::DecodeContext::default(),
                )?;
                continue;
            }

            // All primitive groups of a block contain the same kind of
            // elements, so the first field of the first group is enough.
            let _ = prost::encoding::decode_varint(&mut blob)?;
            let (tag, _wire_type) = prost::encoding::decode_key(&mut blob)?;
            return match tag {
                NODES_TAG => Ok(BlockType::Nodes),
                DENSE_NODES_TAG => Ok(BlockType::DenseNodes),
                WAYS_TAG => Ok(BlockType::Ways),
                RELATIONS_TAG => Ok(BlockType::Relations),
                CHANGESETS_TAG => Ok(BlockType::Changesets),
                _ => Err(Error::InvalidData(format!(
                    "malformed primitive block: unknown group field {}",
                    tag
                ))),
            };
        }
    }
}

/// Location of a blob in the input data
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct BlockIndex {
    pub block_type: BlockType,
    pub blob_start: usize,
    pub blob_len: usize,
}

struct BlockIndexIterator<'a> {
    data: &'a [u8],
    cursor: usize,
}

enum BlobInfo<'a> {
    Header(BlockIndex),
    Data(usize, &'a [u8]),
}

impl<'a> BlockIndexIterator<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    fn read(&mut self, len: usize) -> Result<&'a [u8]> {
        let data = self
            .cursor
            .checked_add(len)
            .and_then(|end| self.data.get(self.cursor..end))
            .ok_or_else(|| Error::InvalidData(format!("truncated blob at {}", self.cursor)))?;
        self.cursor += len;
        Ok(data)
    }

    fn next_blob(&mut self) -> Result<BlobInfo<'a>> {
        let blob_header_len = NetworkEndian::read_i32(self.read(4)?);
        let blob_header = BlobHeader::decode(self.read(blob_header_len as usize)?)?;

        let blob_start = self.cursor;
        let blob = self.read(blob_header.datasize as usize)?;

        match blob_header.r#type.as_str() {
            "OSMHeader" => Ok(BlobInfo::Header(BlockIndex {
                block_type: BlockType::Header,
                blob_start,
                blob_len: blob.len(),
            })),
            "OSMData" => Ok(BlobInfo::Data(blob_start, blob)),
            other => Err(Error::InvalidData(format!("unknown blob type {}", other))),
        }
    }
}

impl<'a> Iterator for BlockIndexIterator<'a> {
    type Item = Result<BlobInfo<'a>>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor < self.data.len() {
            let next = self.next_blob();
            if next.is_err() {
                // the blob sequence can not be followed after a broken blob
                self.cursor = self.data.len();
            }
            Some(next)
        } else {
            None
        }
    }
}

/// Returns the decompressed content of a blob.
fn decode_blob(blob: &[u8]) -> Result<Vec<u8>> {
    let blob = Blob::decode(blob)?;
    let data = match (blob.raw, blob.zlib_data) {
        (Some(raw), _) => raw,
        (None, Some(zlib_data)) => {
            let mut data = Vec::with_capacity(blob.raw_size.unwrap_or(0).max(0) as usize);
            ZlibDecoder::new(&zlib_data[..]).read_to_end(&mut data)?;
            data
        }
        (None, None) => {
            return Err(Error::InvalidData("unsupported blob compression".into()));
        }
    };
    if let Some(raw_size) = blob.raw_size {
        if raw_size as usize != data.len() {
            return Err(Error::InvalidData(format!(
                "blob size mismatch: expected {}, got {}",
                raw_size,
                data.len()
            )));
        }
    }
    Ok(data)
}

/// Reads and decodes the block at `idx`.
pub fn read_block<T: Message + Default>(data: &[u8], idx: &BlockIndex) -> Result<T> {
    let blob = data
        .get(idx.blob_start..idx.blob_start + idx.blob_len)
        .ok_or_else(|| Error::InvalidData("block index out of range".into()))?;
    Ok(T::decode(decode_blob(blob)?.as_slice())?)
}

fn index_data_blob(blob_start: usize, blob: &[u8]) -> Result<BlockIndex> {
    Ok(BlockIndex {
        block_type: BlockType::from_osmdata_blob(&decode_blob(blob)?)?,
        blob_start,
        blob_len: blob.len(),
    })
}

/// Builds an index of all blocks in `pbf_data`, sorted by block type and
/// position.
///
/// Blocks which cannot be read are skipped; their number is returned next to
/// the index.
pub fn build_block_index(pbf_data: &[u8]) -> (Vec<BlockIndex>, usize) {
    let (mut result, errors): (Vec<BlockIndex>, Vec<Error>) = BlockIndexIterator::new(pbf_data)
        .par_bridge()
        .partition_map(|blob| {
            let block = match blob {
                Ok(BlobInfo::Header(b)) => Ok(b),
                Ok(BlobInfo::Data(start, blob)) => index_data_blob(start, blob),
                Err(e) => Err(e),
            };
            match block {
                Ok(b) => Either::Left(b),
                Err(e) => Either::Right(e),
            }
        });
    for e in &errors {
        warn!("Skipping block due to error: {}", e);
    }
    result.par_sort_unstable();
    info!("Found {} blocks", result.len());
    (result, errors.len())
}
