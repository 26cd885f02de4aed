//! Compound File Reader
//!
//! `.xls`ファイルの器であるOLE2複合ドキュメントから、ルート直下の
//! ストリームを読み出す最小限のリーダー。
//! セル値の読み取りはcalamineに任せ、ここでは書式解析に必要な
//! `Workbook`ストリームと暗号化の判定だけを扱います。

/// OLE2ファイルのシグネチャ
pub(crate) const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const HEADER_SIZE: usize = 512;
const DIFAT_IN_HEADER: usize = 109;
const DIRENTRY_SIZE: usize = 128;

const ENDOFCHAIN: u32 = 0xFFFF_FFFE;
const FREESECT: u32 = 0xFFFF_FFFF;
const NOSTREAM: u32 = 0xFFFF_FFFF;

const STGTY_STREAM: u8 = 2;
const STGTY_ROOT: u8 = 5;

#[derive(Debug, Clone)]
struct DirEntry {
    name: String,
    entry_type: u8,
    left: u32,
    right: u32,
    child: u32,
    start: u32,
    size: u64,
}

/// 解析済みの複合ドキュメント
#[derive(Debug)]
pub(crate) struct CompoundFile<'a> {
    data: &'a [u8],
    sector_size: usize,
    mini_sector_size: usize,
    mini_cutoff: u64,
    fat: Vec<u32>,
    minifat: Vec<u32>,
    entries: Vec<DirEntry>,
    mini_stream: Vec<u8>,
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, String> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| format!("Unexpected end of compound file at offset {}", offset))
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, String> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| format!("Unexpected end of compound file at offset {}", offset))
}

/// 先頭バイトがOLE2シグネチャかどうか
pub(crate) fn is_compound_file(data: &[u8]) -> bool {
    data.starts_with(&OLE_MAGIC)
}

impl<'a> CompoundFile<'a> {
    /// ヘッダー、FAT、ディレクトリ、ミニストリームを読み込む
    pub fn parse(data: &'a [u8]) -> Result<Self, String> {
        if data.len() < HEADER_SIZE || !is_compound_file(data) {
            return Err("Not an OLE2 compound file".to_string());
        }

        let sector_shift = read_u16(data, 0x1E)?;
        let mini_sector_shift = read_u16(data, 0x20)?;
        if sector_shift != 9 && sector_shift != 12 {
            return Err(format!("Unsupported sector shift: {}", sector_shift));
        }
        if mini_sector_shift >= sector_shift {
            return Err(format!("Invalid mini sector shift: {}", mini_sector_shift));
        }

        let mut cf = CompoundFile {
            data,
            sector_size: 1usize << sector_shift,
            mini_sector_size: 1usize << mini_sector_shift,
            mini_cutoff: u64::from(read_u32(data, 0x38)?),
            fat: Vec::new(),
            minifat: Vec::new(),
            entries: Vec::new(),
            mini_stream: Vec::new(),
        };

        cf.fat = cf.load_fat()?;
        cf.entries = cf.load_directory(read_u32(data, 0x30)?)?;

        let first_minifat = read_u32(data, 0x3C)?;
        let num_minifat = read_u32(data, 0x40)?;
        if num_minifat > 0 && first_minifat != ENDOFCHAIN {
            let bytes = cf.read_chain(first_minifat)?;
            cf.minifat = bytes
                .chunks_exact(4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
        }

        if let Some(root) = cf.entries.first().filter(|e| e.entry_type == STGTY_ROOT) {
            if root.start != ENDOFCHAIN && root.size > 0 {
                let (start, size) = (root.start, root.size);
                let mut mini_stream = cf.read_chain(start)?;
                mini_stream.truncate(usize::try_from(size).unwrap_or(usize::MAX));
                cf.mini_stream = mini_stream;
            }
        }

        Ok(cf)
    }

    fn sector(&self, index: u32) -> Result<&'a [u8], String> {
        let data: &'a [u8] = self.data;
        let offset = (index as usize)
            .checked_add(1)
            .and_then(|n| n.checked_mul(self.sector_size))
            .ok_or_else(|| format!("Sector index overflow: {}", index))?;
        if offset >= data.len() {
            return Err(format!("Sector {} is beyond end of file", index));
        }
        let end = (offset + self.sector_size).min(data.len());
        Ok(&data[offset..end])
    }

    fn load_fat(&self) -> Result<Vec<u32>, String> {
        let mut fat_sectors = Vec::new();
        for i in 0..DIFAT_IN_HEADER {
            let sector = read_u32(self.data, 0x4C + i * 4)?;
            if sector != FREESECT && sector != ENDOFCHAIN {
                fat_sectors.push(sector);
            }
        }

        // ヘッダーに収まらないFATセクタの一覧はDIFATチェーンに続く
        let entries_per_sector = self.sector_size / 4;
        let mut difat_sector = read_u32(self.data, 0x44)?;
        let num_difat = read_u32(self.data, 0x48)?;
        let mut visited = 0u32;
        while difat_sector != ENDOFCHAIN && difat_sector != FREESECT {
            if visited >= num_difat {
                return Err("DIFAT chain is longer than declared".to_string());
            }
            visited += 1;

            let sector = self.sector(difat_sector)?;
            for i in 0..entries_per_sector - 1 {
                let fat_sector = read_u32(sector, i * 4)?;
                if fat_sector != FREESECT && fat_sector != ENDOFCHAIN {
                    fat_sectors.push(fat_sector);
                }
            }
            difat_sector = read_u32(sector, (entries_per_sector - 1) * 4)?;
        }

        let mut fat = Vec::with_capacity(fat_sectors.len() * entries_per_sector);
        for index in fat_sectors {
            let sector = self.sector(index)?;
            fat.extend(
                sector
                    .chunks_exact(4)
                    .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            );
        }
        Ok(fat)
    }

    /// FATをたどってチェーン全体を読み込む
    fn read_chain(&self, start: u32) -> Result<Vec<u8>, String> {
        let mut out = Vec::new();
        let mut current = start;
        let mut steps = 0usize;
        while current != ENDOFCHAIN {
            // 循環したチェーンはFATの長さを超える
            if steps > self.fat.len() {
                return Err("Sector chain loop detected".to_string());
            }
            steps += 1;

            out.extend_from_slice(self.sector(current)?);
            current = *self
                .fat
                .get(current as usize)
                .ok_or_else(|| format!("Sector {} is not covered by the FAT", current))?;
        }
        Ok(out)
    }

    fn read_mini_chain(&self, start: u32, size: usize) -> Result<Vec<u8>, String> {
        let mut out = Vec::with_capacity(size);
        let mut current = start;
        let mut steps = 0usize;
        while current != ENDOFCHAIN && out.len() < size {
            if steps > self.minifat.len() {
                return Err("Mini sector chain loop detected".to_string());
            }
            steps += 1;

            let offset = current as usize * self.mini_sector_size;
            let chunk = self
                .mini_stream
                .get(offset..offset + self.mini_sector_size)
                .or_else(|| self.mini_stream.get(offset..))
                .filter(|chunk| !chunk.is_empty())
                .ok_or_else(|| format!("Mini sector {} is beyond the mini stream", current))?;
            out.extend_from_slice(chunk);
            current = *self
                .minifat
                .get(current as usize)
                .ok_or_else(|| format!("Mini sector {} is not covered by the MiniFAT", current))?;
        }
        out.truncate(size);
        Ok(out)
    }

    fn load_directory(&self, first_sector: u32) -> Result<Vec<DirEntry>, String> {
        let bytes = self.read_chain(first_sector)?;
        let mut entries = Vec::with_capacity(bytes.len() / DIRENTRY_SIZE);

        for raw in bytes.chunks_exact(DIRENTRY_SIZE) {
            let name_len = (read_u16(raw, 0x40)? as usize).min(64);
            let units: Vec<u16> = raw[..name_len]
                .chunks_exact(2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]))
                .take_while(|&u| u != 0)
                .collect();

            let size_low = u64::from(read_u32(raw, 0x78)?);
            // バージョン3（512バイトセクタ）では上位32ビットを使わない
            let size = if self.sector_size == 512 {
                size_low
            } else {
                size_low | (u64::from(read_u32(raw, 0x7C)?) << 32)
            };

            entries.push(DirEntry {
                name: String::from_utf16_lossy(&units),
                entry_type: raw[0x42],
                left: read_u32(raw, 0x44)?,
                right: read_u32(raw, 0x48)?,
                child: read_u32(raw, 0x4C)?,
                start: read_u32(raw, 0x74)?,
                size,
            });
        }

        if entries.is_empty() {
            return Err("Compound file has no directory entries".to_string());
        }
        Ok(entries)
    }

    /// ルートストレージ直下のストリームを名前で探す（大文字小文字を区別しない）
    fn find_root_stream(&self, name: &str) -> Option<&DirEntry> {
        let root = self.entries.first()?;
        let mut stack = vec![root.child];
        let mut visited = vec![false; self.entries.len()];

        while let Some(id) = stack.pop() {
            if id == NOSTREAM {
                continue;
            }
            let Some(entry) = self.entries.get(id as usize) else {
                continue;
            };
            if std::mem::replace(&mut visited[id as usize], true) {
                continue;
            }
            if entry.entry_type == STGTY_STREAM && entry.name.eq_ignore_ascii_case(name) {
                return Some(entry);
            }
            stack.push(entry.left);
            stack.push(entry.right);
        }
        None
    }

    /// ルート直下に指定したストリームがあるかどうか
    pub fn has_stream(&self, name: &str) -> bool {
        self.find_root_stream(name).is_some()
    }

    /// ルート直下のストリームを読み込む（存在しない場合は`None`）
    pub fn read_stream(&self, name: &str) -> Result<Option<Vec<u8>>, String> {
        let Some(entry) = self.find_root_stream(name) else {
            return Ok(None);
        };

        if entry.size > self.data.len() as u64 {
            return Err(format!(
                "Stream '{}' declares {} bytes, larger than the file",
                entry.name, entry.size
            ));
        }
        let size = entry.size as usize;
        if size == 0 {
            return Ok(Some(Vec::new()));
        }

        if entry.size < self.mini_cutoff {
            return self.read_mini_chain(entry.start, size).map(Some);
        }

        let mut bytes = self.read_chain(entry.start)?;
        if bytes.len() < size {
            return Err(format!("Stream '{}' is truncated", entry.name));
        }
        bytes.truncate(size);
        Ok(Some(bytes))
    }
}
