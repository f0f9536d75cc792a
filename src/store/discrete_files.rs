use crate::error::{Result, StoreError};
use crate::store::{Batch, KeySet, KeyValueStore};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Persistent store keeping every record in its own file under one directory.
///
/// The key → file index lives in memory and is rebuilt from the directory on `open`, so the
/// directory is the only durable state. Writes go straight to disk, there is nothing for
/// `commit` to flush.
pub struct DiscreteFileStore<Serde>
where
    Serde: DiscreteFileSerializerDeserializer,
{
    directory: PathBuf,
    name: Option<String>,
    state: RwLock<FileState>,
    phantom_serde: PhantomData<fn() -> Serde>,
}

#[derive(Default)]
struct FileState {
    open: bool,
    index: HashMap<Vec<u8>, PathBuf>,
    pending: Vec<(Vec<u8>, Vec<u8>)>,
}

impl FileState {
    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::Closed)
        }
    }
}

impl<Serde> DiscreteFileStore<Serde>
where
    Serde: DiscreteFileSerializerDeserializer,
{
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let name = directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        Self {
            directory,
            name,
            state: RwLock::default(),
            phantom_serde: PhantomData,
        }
    }

    fn rehydrate_index(&self) -> Result<HashMap<Vec<u8>, PathBuf>> {
        fs::create_dir_all(&self.directory)?;

        let mut index = HashMap::new();
        for entry in fs::read_dir(&self.directory)?.flatten() {
            let path = entry.path();
            match read_record::<Serde>(&path) {
                Ok(record) => {
                    index.insert(record.key, path);
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable record")
                }
            }
        }

        debug!(
            directory = %self.directory.display(),
            records = index.len(),
            "rebuilt record index"
        );
        Ok(index)
    }

    fn write(
        &self,
        index: &mut HashMap<Vec<u8>, PathBuf>,
        key: &[u8],
        value: &[u8],
    ) -> Result<()> {
        let path = record_path(&self.directory, index, key);
        write_record::<Serde>(
            &path,
            &Record {
                key: key.to_vec(),
                value: value.to_vec(),
            },
        )?;

        // Only a record that reached the disk may be indexed.
        index.insert(key.to_vec(), path);
        Ok(())
    }
}

impl<Serde> KeyValueStore for DiscreteFileStore<Serde>
where
    Serde: DiscreteFileSerializerDeserializer,
{
    fn open(&self) -> Result<bool> {
        let mut state = self.state.write();
        if state.open {
            return Ok(true);
        }

        state.index = self.rehydrate_index()?;
        state.open = true;
        Ok(true)
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.write();
        state.open = false;
        state.index.clear();
        state.pending.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.read().open
    }

    fn commit(&self) -> Result<bool> {
        Ok(self.state.read().open)
    }

    fn compact(&self) -> Result<()> {
        self.state.read().ensure_open()
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let state = self.state.read();
        state.ensure_open()?;

        match state.index.get(key) {
            Some(path) => Ok(Some(read_record::<Serde>(path)?.value)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;
        self.write(&mut state.index, key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;
        delete(&mut state.index, key)
    }

    fn put_batch(&self, batch: &Batch) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;
        for (key, value) in batch {
            self.write(&mut state.index, key, value)?;
        }
        Ok(())
    }

    fn put_to_batch(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;
        state.pending.push((key.to_vec(), value.to_vec()));
        Ok(())
    }

    fn commit_batch(&self) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;
        let pending = std::mem::take(&mut state.pending);
        for (key, value) in pending {
            self.write(&mut state.index, &key, &value)?;
        }
        Ok(())
    }

    fn delete_batch(&self, keys: &[Vec<u8>]) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;
        for key in keys {
            delete(&mut state.index, key)?;
        }
        Ok(())
    }

    fn drop_all(&self) -> Result<()> {
        let mut state = self.state.write();
        state.ensure_open()?;
        flush(&self.directory)?;
        state.index.clear();
        state.pending.clear();
        Ok(())
    }

    fn keys(&self) -> Result<KeySet> {
        let state = self.state.read();
        state.ensure_open()?;
        Ok(state.index.keys().cloned().collect())
    }

    fn is_empty(&self) -> Result<bool> {
        let state = self.state.read();
        state.ensure_open()?;
        Ok(state.index.is_empty())
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn path(&self) -> Option<PathBuf> {
        Some(self.directory.clone())
    }

    fn approximate_size(&self) -> i64 {
        let state = self.state.read();
        if !state.open {
            return -1;
        }
        i64::try_from(state.index.len()).unwrap_or(i64::MAX)
    }

    fn is_auto_commit_enabled(&self) -> bool {
        true
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn is_created_on_disk(&self) -> bool {
        self.directory.is_dir()
    }

    fn is_locked(&self) -> bool {
        self.state.is_locked()
    }
}

impl<Serde> fmt::Display for DiscreteFileStore<Serde>
where
    Serde: DiscreteFileSerializerDeserializer,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DiscreteFileStore:{}", self.directory.display())
    }
}

fn read_record<Serde>(path: &Path) -> Result<Record>
where
    Serde: DiscreteFileSerializerDeserializer,
{
    let file = File::open(path)?;
    Serde::deserialize(BufReader::new(file)).map_err(|reason| StoreError::Decode {
        path: path.to_path_buf(),
        reason,
    })
}

fn write_record<Serde>(path: &Path, record: &Record) -> Result<()>
where
    Serde: DiscreteFileSerializerDeserializer,
{
    let mut writer = BufWriter::new(File::create(path)?);
    Serde::serialize(&mut writer, record).map_err(StoreError::Encode)?;
    writer.flush()?;
    Ok(())
}

fn delete(index: &mut HashMap<Vec<u8>, PathBuf>, key: &[u8]) -> Result<()> {
    if let Some(path) = index.remove(key) {
        fs::remove_file(path)?;
    }

    Ok(())
}

fn flush(directory: &Path) -> Result<()> {
    match fs::remove_dir_all(directory) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    fs::create_dir_all(directory)?;
    Ok(())
}

/// The file already holding `key`, or a fresh uuid-named one.
fn record_path(directory: &Path, index: &HashMap<Vec<u8>, PathBuf>, key: &[u8]) -> PathBuf {
    match index.get(key) {
        Some(path) => path.clone(),
        None => directory.join(Uuid::new_v4().hyphenated().to_string()),
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

pub type FormatResult<T> = std::result::Result<T, String>;

/// Abstracts away the selection of on-disk record format.
/// Buffered I/O is used because with one file per record every access is already a syscall
/// round-trip; there is no reason to add one per field.
pub trait DiscreteFileSerializerDeserializer {
    fn serialize(buffered_writer: &mut BufWriter<File>, record: &Record) -> FormatResult<()>;

    fn deserialize(buffered_reader: BufReader<File>) -> FormatResult<Record>;
}

pub struct JsonDiscreteFileSerializerDeserializer;

impl DiscreteFileSerializerDeserializer for JsonDiscreteFileSerializerDeserializer {
    fn serialize(buffered_writer: &mut BufWriter<File>, record: &Record) -> FormatResult<()> {
        serde_json::to_writer(buffered_writer, record).map_err(|err| err.to_string())
    }

    fn deserialize(buffered_reader: BufReader<File>) -> FormatResult<Record> {
        serde_json::from_reader(buffered_reader).map_err(|err| err.to_string())
    }
}

pub struct BincodeDiscreteFileSerializerDeserializer;

impl DiscreteFileSerializerDeserializer for BincodeDiscreteFileSerializerDeserializer {
    fn serialize(buffered_writer: &mut BufWriter<File>, record: &Record) -> FormatResult<()> {
        bincode::serialize_into(buffered_writer, record).map_err(|err| err.to_string())
    }

    fn deserialize(buffered_reader: BufReader<File>) -> FormatResult<Record> {
        bincode::deserialize_from(buffered_reader).map_err(|err| err.to_string())
    }
}

pub type DiscreteFileStoreBincode = DiscreteFileStore<BincodeDiscreteFileSerializerDeserializer>;
pub type DiscreteFileStoreJson = DiscreteFileStore<JsonDiscreteFileSerializerDeserializer>;
