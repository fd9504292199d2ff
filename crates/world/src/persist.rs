//! Block-entity save files with zstd compression.
//!
//! A save file holds every block of a [`BlockMap`] as a [`BlockRecord`]: the
//! placed block (kind plus block-state properties) and, for block entities,
//! their persisted field set. Each file carries a small header with a magic
//! number, format version and CRC32 of the compressed payload.

use crate::chest::{Chest, EnderChest};
use crate::fields::FieldMap;
use crate::furnace::Furnace;
use crate::hopper::Hopper;
use crate::world::{Block, BlockMap, BlockWorld};
use anyhow::{Context, Result};
use crc32fast::Hasher;
use hopperline_core::{BlockPos, Face};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Magic number for save file identification ("HLBE" = hopperline block entities).
const SAVE_MAGIC: u32 = 0x484C4245;

/// Current save file format version.
const SAVE_VERSION: u16 = 1;

/// Save file header structure.
#[derive(Debug, Clone)]
struct SaveHeader {
    magic: u32,
    version: u16,
    crc32: u32,
    payload_len: u32,
}

impl SaveHeader {
    const LEN: usize = 14;

    fn new(crc32: u32, payload_len: u32) -> Self {
        Self {
            magic: SAVE_MAGIC,
            version: SAVE_VERSION,
            crc32,
            payload_len,
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::LEN);
        bytes.extend_from_slice(&self.magic.to_le_bytes());
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&self.crc32.to_le_bytes());
        bytes.extend_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::LEN {
            anyhow::bail!("Save header too short");
        }

        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != SAVE_MAGIC {
            anyhow::bail!(
                "Invalid save magic: expected 0x{:08X}, got 0x{:08X}",
                SAVE_MAGIC,
                magic
            );
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != SAVE_VERSION {
            anyhow::bail!("Unsupported save version {}", version);
        }
        let crc32 = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        let payload_len = u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]);

        Ok(Self {
            magic,
            version,
            crc32,
            payload_len,
        })
    }
}

/// The kind of block placed at a position, with its block-state properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Solid(u16),
    Hopper { facing: Face, powered: bool },
    Chest,
    Furnace,
    EnderChest,
}

/// One persisted block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub pos: BlockPos,
    pub kind: BlockKind,
    /// Block-entity fields (empty for plain blocks).
    pub fields: FieldMap,
}

impl BlockRecord {
    /// Record the block at `pos`. Air is not recorded.
    pub fn capture(pos: BlockPos, block: &Block) -> Option<Self> {
        let kind = match block {
            Block::Air => return None,
            Block::Solid(id) => BlockKind::Solid(*id),
            Block::Hopper(hopper) => BlockKind::Hopper {
                facing: hopper.facing,
                powered: hopper.powered,
            },
            Block::Chest(_) => BlockKind::Chest,
            Block::Furnace(_) => BlockKind::Furnace,
            Block::EnderChest(_) => BlockKind::EnderChest,
        };
        Some(Self {
            pos,
            kind,
            fields: block.encode_fields().unwrap_or_default(),
        })
    }

    /// Place the block described by this record, then apply its fields.
    pub fn restore(&self) -> Block {
        let placed = match &self.kind {
            BlockKind::Solid(id) => return Block::Solid(*id),
            BlockKind::EnderChest => return Block::EnderChest(EnderChest),
            BlockKind::Hopper { facing, powered } => {
                Block::Hopper(Hopper::new().with_facing(*facing).with_powered(*powered))
            }
            BlockKind::Chest => Block::Chest(Chest::new()),
            BlockKind::Furnace => Block::Furnace(Furnace::new()),
        };
        placed.decode_fields(&self.fields)
    }
}

/// Record every block in the world, in position order.
pub fn capture_world(world: &BlockMap) -> Vec<BlockRecord> {
    world
        .iter()
        .filter_map(|(pos, block)| BlockRecord::capture(pos, block))
        .collect()
}

/// Rebuild a world from records.
pub fn restore_world(records: &[BlockRecord]) -> BlockMap {
    let mut world = BlockMap::new();
    for record in records {
        world.set_block(record.pos, record.restore());
    }
    world
}

/// Save-file manager for block-entity snapshots.
pub struct BlockEntityStore {
    save_dir: PathBuf,
}

impl BlockEntityStore {
    /// Create a new store rooted at the given directory.
    pub fn new<P: AsRef<Path>>(save_dir: P) -> Result<Self> {
        let save_dir = save_dir.as_ref().to_path_buf();
        fs::create_dir_all(&save_dir).context("Failed to create save directory")?;
        Ok(Self { save_dir })
    }

    /// Get the path of a named save file.
    fn save_path(&self, name: &str) -> PathBuf {
        self.save_dir.join(format!("{}.hlbe", name))
    }

    /// Check if a named save exists.
    pub fn exists(&self, name: &str) -> bool {
        self.save_path(name).exists()
    }

    /// Write the records to a named save file, replacing any previous one.
    pub fn save(&self, name: &str, records: &[BlockRecord]) -> Result<()> {
        let path = self.save_path(name);

        // Serialize records.
        let serialized = bincode::serialize(records).context("Failed to serialize block records")?;

        // Compress with zstd (level 3 for balanced speed/compression).
        let compressed =
            zstd::encode_all(&serialized[..], 3).context("Failed to compress block records")?;

        // Compute CRC32.
        let mut hasher = Hasher::new();
        hasher.update(&compressed);
        let crc32 = hasher.finalize();

        let header = SaveHeader::new(crc32, compressed.len() as u32);

        let mut file = File::create(&path).context("Failed to create save file")?;
        file.write_all(&header.to_bytes())
            .context("Failed to write header")?;
        file.write_all(&compressed)
            .context("Failed to write payload")?;

        debug!(path = %path.display(), records = records.len(), "saved block entities");
        Ok(())
    }

    /// Read the records of a named save file.
    pub fn load(&self, name: &str) -> Result<Vec<BlockRecord>> {
        let path = self.save_path(name);
        let mut file = File::open(&path)
            .with_context(|| format!("Failed to open save file {}", path.display()))?;

        // Read header.
        let mut header_bytes = [0u8; SaveHeader::LEN];
        file.read_exact(&mut header_bytes)
            .context("Failed to read save header")?;
        let header = SaveHeader::from_bytes(&header_bytes)?;

        // Read compressed payload.
        let mut compressed = vec![0u8; header.payload_len as usize];
        file.read_exact(&mut compressed)
            .context("Failed to read save payload")?;

        // Verify CRC32.
        let mut hasher = Hasher::new();
        hasher.update(&compressed);
        let computed_crc = hasher.finalize();

        if computed_crc != header.crc32 {
            anyhow::bail!(
                "CRC32 mismatch: expected {:08X}, got {:08X}",
                header.crc32,
                computed_crc
            );
        }

        let decompressed =
            zstd::decode_all(&compressed[..]).context("Failed to decompress save")?;
        let records: Vec<BlockRecord> =
            bincode::deserialize(&decompressed).context("Failed to deserialize block records")?;

        debug!(path = %path.display(), records = records.len(), "loaded block entities");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hopperline_core::{blocks, ItemStack, ItemType};
    use std::env;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(tag: &str) -> PathBuf {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        env::temp_dir().join(format!("hopperline_test_{}_{}", tag, timestamp))
    }

    #[test]
    fn save_header_roundtrip() {
        let header = SaveHeader::new(0xDEADBEEF, 1234);
        let bytes = header.to_bytes();
        let decoded = SaveHeader::from_bytes(&bytes).unwrap();

        assert_eq!(decoded.magic, SAVE_MAGIC);
        assert_eq!(decoded.version, SAVE_VERSION);
        assert_eq!(decoded.crc32, 0xDEADBEEF);
        assert_eq!(decoded.payload_len, 1234);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = SaveHeader::new(0, 0).to_bytes();
        bytes[0] ^= 0xFF;
        assert!(SaveHeader::from_bytes(&bytes).is_err());
        assert!(SaveHeader::from_bytes(&bytes[..4]).is_err());
    }

    #[test]
    fn save_and_load_world() {
        let dir = temp_dir("save");
        let store = BlockEntityStore::new(&dir).unwrap();

        let mut world = BlockMap::new();
        let hopper = Hopper::new().with_facing(Face::East).with_name("Feeder");
        hopper
            .inventory()
            .set_item(1, Some(ItemStack::new(ItemType::Block(blocks::IRON_ORE), 7)))
            .unwrap();
        world.set_block(BlockPos::new(0, 64, 0), Block::Hopper(hopper));
        world.set_block(BlockPos::new(1, 64, 0), Block::Furnace(Furnace::new()));
        world.set_block(BlockPos::new(0, 63, 0), Block::Solid(blocks::STONE));
        world.set_block(BlockPos::new(0, 65, 0), Block::EnderChest(EnderChest));

        let records = capture_world(&world);
        store.save("world", &records).expect("save");
        assert!(store.exists("world"));

        let loaded = store.load("world").expect("load");
        assert_eq!(loaded, records);

        let restored = restore_world(&loaded);
        assert_eq!(restored.len(), 4);
        let Block::Hopper(hopper) = restored.block_at(BlockPos::new(0, 64, 0)) else {
            panic!("hopper restored");
        };
        assert_eq!(hopper.facing, Face::East);
        assert_eq!(hopper.custom_name, "Feeder");
        assert_eq!(hopper.inventory().total_count(), 7);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn corrupted_payload_fails_crc() {
        let dir = temp_dir("corrupt");
        let store = BlockEntityStore::new(&dir).unwrap();
        let record = BlockRecord::capture(BlockPos::new(0, 0, 0), &Block::Chest(Chest::new()))
            .expect("chest is recorded");
        store.save("corrupt", &[record]).unwrap();

        let path = store.save_path("corrupt");
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let err = store.load("corrupt").unwrap_err();
        assert!(err.to_string().contains("CRC32 mismatch"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_save_is_an_error() {
        let dir = temp_dir("missing");
        let store = BlockEntityStore::new(&dir).unwrap();
        assert!(!store.exists("nope"));
        assert!(store.load("nope").is_err());
        fs::remove_dir_all(&dir).ok();
    }
}
