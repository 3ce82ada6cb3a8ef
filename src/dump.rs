// HWBENCH DUMP CODECS
// TWO EQUIVALENT ON-DISK FORMS OF A SampleSeries, SAME KEY NAMES IN BOTH:
//   bundle: GZIP STREAM OF NAMED LITTLE-ENDIAN f64 ARRAYS (DEFAULT)
//   json:   ONE OBJECT, ONE ARRAY PER KEY
// FILES ARE WRITTEN TO A TEMP NAME AND RENAMED: A CLIENT WATCHING FOR THE
// DUMP NEVER SEES A HALF-WRITTEN FILE.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::DumpError;
use crate::series::{SampleSeries, KEY_TICKS, SERIES_KEYS};

const BUNDLE_MAGIC: &[u8; 4] = b"HWSB";
// v1: ARRAYS ONLY. v2: ARRAYS THEN TICK LABELS.
const BUNDLE_VERSION: u8 = 2;
const BUNDLE_VERSION_UNLABELED: u8 = 1;
const BUNDLE_EXTENSION: &str = "hws.gz";
const JSON_EXTENSION: &str = "json";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DumpFormat {
    #[default]
    Bundle,
    Json,
}

impl DumpFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Bundle => BUNDLE_EXTENSION,
            Self::Json => JSON_EXTENSION,
        }
    }

    pub fn of_path(path: &Path) -> Result<Self, DumpError> {
        let name = path.to_string_lossy();
        if name.ends_with(BUNDLE_EXTENSION) {
            Ok(Self::Bundle)
        } else if name.ends_with(JSON_EXTENSION) {
            Ok(Self::Json)
        } else {
            Err(DumpError::UnknownFormat(name.into_owned()))
        }
    }
}

impl fmt::Display for DumpFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bundle => "bundle",
            Self::Json => "json",
        })
    }
}

impl FromStr for DumpFormat {
    type Err = DumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bundle" | "gz" => Ok(Self::Bundle),
            "json" => Ok(Self::Json),
            other => Err(DumpError::UnknownFormat(other.to_string())),
        }
    }
}

/// `<name>.<ext>`, unless `name` already carries the extension.
pub fn dump_path(name: &str, format: DumpFormat) -> PathBuf {
    let ext = format.extension();
    if name.ends_with(&format!(".{}", ext)) {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{}.{}", name, ext))
    }
}

pub fn write(series: &SampleSeries, path: &Path, format: DumpFormat) -> Result<(), DumpError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let encoded = File::create(&tmp).map_err(DumpError::from).and_then(|f| {
        let file = BufWriter::new(f);
        match format {
            DumpFormat::Bundle => encode_bundle(series, file),
            DumpFormat::Json => encode_json(series, file),
        }
    });
    let written = encoded.and_then(|()| std::fs::rename(&tmp, path).map_err(DumpError::from));
    if written.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    written
}

pub fn load(path: &Path) -> Result<SampleSeries, DumpError> {
    let format = DumpFormat::of_path(path)?;
    let file = File::open(path)?;
    match format {
        DumpFormat::Bundle => decode_bundle(file),
        DumpFormat::Json => decode_json(file),
    }
}

// --- JSON ---

#[derive(Serialize)]
struct JsonDumpRef<'a> {
    gpu_psu: &'a [f64],
    gpu_exe_utl: &'a [f64],
    gpu_mem_utl: &'a [f64],
    gpu_mem: &'a [f64],
    cpu_exe_utl: &'a [f64],
    cpu_psu: &'a [f64],
    ticks: &'a [usize],
    tick_labels: &'a [String],
}

#[derive(Deserialize)]
struct JsonDump {
    gpu_psu: Vec<f64>,
    gpu_exe_utl: Vec<f64>,
    gpu_mem_utl: Vec<f64>,
    gpu_mem: Vec<f64>,
    cpu_exe_utl: Vec<f64>,
    cpu_psu: Vec<f64>,
    #[serde(default)]
    ticks: Vec<usize>,
    #[serde(default)]
    tick_labels: Vec<String>,
}

fn encode_json<W: Write>(series: &SampleSeries, mut w: W) -> Result<(), DumpError> {
    let doc = JsonDumpRef {
        gpu_psu: series.gpu_power_w(),
        gpu_exe_utl: series.gpu_util_pct(),
        gpu_mem_utl: series.gpu_mem_util_pct(),
        gpu_mem: series.gpu_mem_used_mb(),
        cpu_exe_utl: series.cpu_util_pct(),
        cpu_psu: series.cpu_power_w_estimated(),
        ticks: series.ticks(),
        tick_labels: series.tick_labels(),
    };
    serde_json::to_writer_pretty(&mut w, &doc)?;
    w.flush()?;
    Ok(())
}

fn decode_json<R: Read>(r: R) -> Result<SampleSeries, DumpError> {
    let d: JsonDump = serde_json::from_reader(r)?;
    SampleSeries::from_columns(
        [d.gpu_psu, d.gpu_exe_utl, d.gpu_mem_utl, d.gpu_mem, d.cpu_exe_utl, d.cpu_psu],
        d.ticks,
        d.tick_labels,
    )
}

// --- BUNDLE ---
// LAYOUT (INSIDE GZIP):
//   MAGIC[4] VERSION:u8 COUNT:u32
//   COUNT x { NAME_LEN:u16 NAME[NAME_LEN] LEN:u64 LEN x f64 }
//   v2 ONLY: LABEL_COUNT:u32 LABEL_COUNT x { LEN:u16 UTF8[LEN] }
// ALL INTEGERS AND FLOATS LITTLE-ENDIAN.

fn encode_bundle<W: Write>(series: &SampleSeries, w: W) -> Result<(), DumpError> {
    let ticks: Vec<f64> = series.ticks().iter().map(|&t| t as f64).collect();
    let mut arrays: Vec<(&str, &[f64])> = series.columns().to_vec();
    arrays.push((KEY_TICKS, ticks.as_slice()));

    let mut gz = GzEncoder::new(w, Compression::default());
    gz.write_all(BUNDLE_MAGIC)?;
    gz.write_all(&[BUNDLE_VERSION])?;
    gz.write_all(&(arrays.len() as u32).to_le_bytes())?;
    for (name, values) in arrays {
        gz.write_all(&(name.len() as u16).to_le_bytes())?;
        gz.write_all(name.as_bytes())?;
        gz.write_all(&(values.len() as u64).to_le_bytes())?;
        for v in values {
            gz.write_all(&v.to_le_bytes())?;
        }
    }
    gz.write_all(&(series.tick_labels().len() as u32).to_le_bytes())?;
    for label in series.tick_labels() {
        let bytes = label.as_bytes();
        let len = u16::try_from(bytes.len())
            .map_err(|_| DumpError::Format(format!("tick label of {} bytes", bytes.len())))?;
        gz.write_all(&len.to_le_bytes())?;
        gz.write_all(bytes)?;
    }
    gz.finish()?.flush()?;
    Ok(())
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], DumpError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&e| e <= self.buf.len())
            .ok_or_else(|| DumpError::Format(format!("truncated at byte {}", self.pos)))?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DumpError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

fn decode_bundle<R: Read>(r: R) -> Result<SampleSeries, DumpError> {
    let mut raw = Vec::new();
    GzDecoder::new(r).read_to_end(&mut raw)?;
    let mut cur = Cursor { buf: &raw, pos: 0 };

    if cur.take(4)? != BUNDLE_MAGIC {
        return Err(DumpError::Format("bad magic".into()));
    }
    let version = cur.array::<1>()?[0];
    if version != BUNDLE_VERSION && version != BUNDLE_VERSION_UNLABELED {
        return Err(DumpError::Format(format!("unsupported version {}", version)));
    }

    let count = u32::from_le_bytes(cur.array()?);
    let mut arrays: HashMap<String, Vec<f64>> = HashMap::new();
    for _ in 0..count {
        let name_len = u16::from_le_bytes(cur.array()?) as usize;
        let name = std::str::from_utf8(cur.take(name_len)?)
            .map_err(|e| DumpError::Format(format!("array name: {}", e)))?
            .to_string();
        let len = u64::from_le_bytes(cur.array()?) as usize;
        let bytes = cur.take(len.checked_mul(8).ok_or_else(|| {
            DumpError::Format(format!("array `{}` length overflow", name))
        })?)?;
        let values = bytes
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes(b.try_into().unwrap_or([0; 8])))
            .collect();
        arrays.insert(name, values);
    }

    let mut tick_labels = Vec::new();
    if version == BUNDLE_VERSION {
        let n = u32::from_le_bytes(cur.array()?);
        for _ in 0..n {
            let len = u16::from_le_bytes(cur.array()?) as usize;
            let label = std::str::from_utf8(cur.take(len)?)
                .map_err(|e| DumpError::Format(format!("tick label: {}", e)))?;
            tick_labels.push(label.to_string());
        }
    }

    let mut take = |key: &str| {
        arrays
            .remove(key)
            .ok_or_else(|| DumpError::Format(format!("missing array `{}`", key)))
    };
    let columns = [
        take(SERIES_KEYS[0])?,
        take(SERIES_KEYS[1])?,
        take(SERIES_KEYS[2])?,
        take(SERIES_KEYS[3])?,
        take(SERIES_KEYS[4])?,
        take(SERIES_KEYS[5])?,
    ];
    let ticks = match arrays.remove(KEY_TICKS) {
        Some(t) => t
            .into_iter()
            .map(|v| {
                if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
                    Ok(v as usize)
                } else {
                    Err(DumpError::Format(format!("bad tick index {}", v)))
                }
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    SampleSeries::from_columns(columns, ticks, tick_labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{HardwareReading, KEY_TICK_LABELS};

    fn sample_series(n: usize) -> SampleSeries {
        let mut s = SampleSeries::new();
        for i in 0..n {
            let r = HardwareReading {
                gpu_power_w: 100.0 + i as f64,
                gpu_util_pct: 90.0,
                gpu_mem_util_pct: 30.5,
                gpu_mem_used_mb: 2048.0,
                cpu_util_pct: 12.5,
            };
            s.push(&r, 60.0);
            if i == 1 {
                s.tick(Some("warm"));
            }
        }
        s
    }

    #[test]
    fn dump_path_appends_extension_once() {
        assert_eq!(dump_path("hws_dump", DumpFormat::Json), PathBuf::from("hws_dump.json"));
        assert_eq!(dump_path("run.json", DumpFormat::Json), PathBuf::from("run.json"));
        assert_eq!(dump_path("run", DumpFormat::Bundle), PathBuf::from("run.hws.gz"));
    }

    #[test]
    fn format_from_name_and_path() {
        assert_eq!("JSON".parse::<DumpFormat>().unwrap(), DumpFormat::Json);
        assert_eq!("bundle".parse::<DumpFormat>().unwrap(), DumpFormat::Bundle);
        assert!("npz".parse::<DumpFormat>().is_err());
        assert_eq!(DumpFormat::of_path(Path::new("a/b.hws.gz")).unwrap(), DumpFormat::Bundle);
        assert!(DumpFormat::of_path(Path::new("a/b.csv")).is_err());
    }

    #[test]
    fn bundle_file_restores_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.hws.gz");
        let s = sample_series(4);
        write(&s, &path, DumpFormat::Bundle).unwrap();
        assert_eq!(load(&path).unwrap(), s);
        assert!(!dir.path().join("x.hws.gz.tmp").exists());
    }

    #[test]
    fn json_uses_fixed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.json");
        write(&sample_series(3), &path, DumpFormat::Json).unwrap();
        let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        for key in SERIES_KEYS {
            assert_eq!(v[key].as_array().unwrap().len(), 3, "{}", key);
        }
        assert_eq!(v["ticks"], serde_json::json!([2]));
        assert_eq!(v[KEY_TICK_LABELS], serde_json::json!(["warm"]));
        assert_eq!(load(&path).unwrap().len(), 3);
    }

    #[test]
    fn empty_series_dumps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.hws.gz");
        write(&SampleSeries::new(), &path, DumpFormat::Bundle).unwrap();
        assert!(load(&path).unwrap().is_empty());
    }

    #[test]
    fn truncated_bundle_is_rejected() {
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(b"HWSB\x01\x06\x00\x00\x00").unwrap();
        let bytes = gz.finish().unwrap();
        let err = decode_bundle(bytes.as_slice()).unwrap_err();
        assert!(matches!(err, DumpError::Format(_)));
    }

    #[test]
    fn bundle_keeps_tick_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.hws.gz");
        write(&sample_series(3), &path, DumpFormat::Bundle).unwrap();
        let back = load(&path).unwrap();
        assert_eq!(back.tick_named("warm"), Some(2));
    }

    #[test]
    fn unlabeled_bundle_still_loads() {
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(b"HWSB\x01").unwrap();
        gz.write_all(&7u32.to_le_bytes()).unwrap();
        for key in SERIES_KEYS.iter().chain([&KEY_TICKS]) {
            gz.write_all(&(key.len() as u16).to_le_bytes()).unwrap();
            gz.write_all(key.as_bytes()).unwrap();
            let values: &[f64] = if *key == KEY_TICKS { &[0.0] } else { &[5.0] };
            gz.write_all(&(values.len() as u64).to_le_bytes()).unwrap();
            for v in values {
                gz.write_all(&v.to_le_bytes()).unwrap();
            }
        }
        let bytes = gz.finish().unwrap();
        let s = decode_bundle(bytes.as_slice()).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s.ticks(), &[0]);
        assert_eq!(s.tick_labels(), &[String::new()]);
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A NON-EMPTY DIRECTORY IS NEVER A RENAME TARGET FOR A FILE
        let path = dir.path().join("taken.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();
        assert!(write(&sample_series(2), &path, DumpFormat::Json).is_err());
        assert!(!dir.path().join("taken.json.tmp").exists());
    }

    #[test]
    fn failed_encode_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.hws.gz");
        let mut s = sample_series(2);
        s.tick(Some("x".repeat(70_000).as_str()));
        assert!(write(&s, &path, DumpFormat::Bundle).is_err());
        assert!(!path.exists());
        assert!(!dir.path().join("long.hws.gz.tmp").exists());
    }
}
