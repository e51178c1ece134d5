//! Flat-file persistence.
//!
//! Only the level-0 chain is persisted, one record per line, in ascending key
//! order:
//!
//! ```text
//! 1:b;
//! 3:c;
//! 5:a;
//! ```
//!
//! The first `:` splits key from value and the trailing `;` is optional on
//! read. Nothing is escaped, so a key containing `:` (or a value ending in
//! `;`) does not survive a round trip. Loading replays inserts, so the level
//! structure is rebuilt from fresh draws.
//!
//! Bad lines never fail a load. They are skipped and counted in the returned
//! [`LoadReport`]. Only failing to open, read, or write the file is an error.
//!
//! There is no crash consistency: `dump` truncates the file in place.

use std::fmt::{self, Write as _};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rand_core::RngCore;
use thiserror::Error;
use tracing::{debug, warn};

use crate::Index;
use crate::error::{Error, Result};
use crate::skiplist::{InsertOutcome, SkipList};

/// File name used by [`FlatFile::default`].
pub const DEFAULT_STORE_FILE: &str = "dumpFile.txt";

/// Separates key text from value text.
pub const FIELD_DELIMITER: char = ':';

/// Written after every value.
pub const RECORD_TERMINATOR: char = ';';

// ============================================================================
// Codecs
// ============================================================================

/// A field that could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot decode {text:?}: {reason}")]
pub struct DecodeError {
    /// The offending text.
    pub text: String,
    /// Why decoding failed.
    pub reason: String,
}

impl DecodeError {
    /// Creates a decode error for `text`.
    pub fn new(text: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            text: text.into(),
            reason: reason.to_string(),
        }
    }
}

/// Converts keys or values to and from their textual field form.
pub trait Codec<T> {
    /// Appends the textual form of `value` to `out`.
    fn encode(&self, value: &T, out: &mut String);

    /// Parses a field back into a value.
    fn decode(&self, text: &str) -> std::result::Result<T, DecodeError>;
}

/// Codec for any `Display + FromStr` type (integers, `String`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayCodec;

impl<T> Codec<T> for DisplayCodec
where
    T: fmt::Display + FromStr,
    T::Err: fmt::Display,
{
    #[inline]
    fn encode(&self, value: &T, out: &mut String) {
        // Writing into a String cannot fail.
        let _ = write!(out, "{value}");
    }

    /// Parses the text as written. When that fails, surrounding whitespace
    /// is trimmed and the parse retried, so ` 7 ` still reads as an integer
    /// while a `String` keeps its padding.
    fn decode(&self, text: &str) -> std::result::Result<T, DecodeError> {
        text.parse().or_else(|err| {
            let trimmed = text.trim();
            if trimmed.len() == text.len() {
                return Err(DecodeError::new(text, err));
            }
            trimmed.parse().map_err(|err| DecodeError::new(text, err))
        })
    }
}

/// Codec built from a pair of functions.
///
/// ```
/// use nexus_skiplist::{Codec, DecodeError, FnCodec};
///
/// let hex = FnCodec::new(
///     |v: &u32, out: &mut String| out.push_str(&format!("{v:x}")),
///     |s: &str| u32::from_str_radix(s, 16).map_err(|e| DecodeError::new(s, e)),
/// );
///
/// let mut text = String::new();
/// hex.encode(&255, &mut text);
/// assert_eq!(text, "ff");
/// assert_eq!(hex.decode("ff"), Ok(255));
/// ```
#[derive(Clone, Copy)]
pub struct FnCodec<E, D> {
    encode: E,
    decode: D,
}

impl<E, D> FnCodec<E, D> {
    /// Pairs an encode function with a decode function.
    pub fn new(encode: E, decode: D) -> Self {
        Self { encode, decode }
    }
}

impl<T, E, D> Codec<T> for FnCodec<E, D>
where
    E: Fn(&T, &mut String),
    D: Fn(&str) -> std::result::Result<T, DecodeError>,
{
    #[inline]
    fn encode(&self, value: &T, out: &mut String) {
        (self.encode)(value, out)
    }

    #[inline]
    fn decode(&self, text: &str) -> std::result::Result<T, DecodeError> {
        (self.decode)(text)
    }
}

impl<E, D> fmt::Debug for FnCodec<E, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCodec").finish_non_exhaustive()
    }
}

// ============================================================================
// Load bookkeeping
// ============================================================================

/// What a load did with each line of input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Records inserted.
    pub inserted: usize,
    /// Records whose key was already present.
    pub duplicates: usize,
    /// Lines that are empty, lack the delimiter, have an empty key or value,
    /// or are not UTF-8.
    pub malformed: usize,
    /// Lines whose key text the key codec rejected.
    pub key_parse_failures: usize,
    /// Lines whose value text the value codec rejected.
    pub value_parse_failures: usize,
}

impl LoadReport {
    /// Lines dropped before reaching the skip list.
    pub fn skipped(&self) -> usize {
        self.malformed + self.key_parse_failures + self.value_parse_failures
    }
}

/// Records decoded from a medium, not yet inserted.
#[derive(Debug)]
pub struct Decoded<K, V> {
    /// Records in file order.
    pub records: Vec<(K, V)>,
    /// Skip counts gathered while decoding.
    pub report: LoadReport,
}

impl<K: Ord, V> Decoded<K, V> {
    /// Inserts every record into `list` and completes the report.
    pub fn apply<R: RngCore, Idx: Index>(self, list: &mut SkipList<K, V, R, Idx>) -> LoadReport {
        let mut report = self.report;
        for (key, value) in self.records {
            match list.insert(key, value) {
                InsertOutcome::Inserted => report.inserted += 1,
                InsertOutcome::AlreadyExists => report.duplicates += 1,
            }
        }
        report
    }
}

// ============================================================================
// Line format
// ============================================================================

/// Splits one line into key text and value text.
///
/// Returns `None` for lines that are empty, lack the delimiter, or leave an
/// empty key or value once trimmed. The key text is passed on untouched;
/// whitespace handling belongs to the key codec. The value loses one
/// trailing terminator.
fn split_record(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    let (key, value) = line.split_once(FIELD_DELIMITER)?;
    let value = value.trim_end();
    let value = value.strip_suffix(RECORD_TERMINATOR).unwrap_or(value);
    if key.trim().is_empty() || value.trim().is_empty() {
        return None;
    }
    Some((key, value))
}

/// Writes the level-0 chain of `list` as `key:value;` lines and flushes.
///
/// Returns the number of records written.
pub fn write_records<K, V, R, Idx, KC, VC, W>(
    list: &SkipList<K, V, R, Idx>,
    key_codec: &KC,
    value_codec: &VC,
    mut out: W,
) -> io::Result<usize>
where
    Idx: Index,
    KC: Codec<K>,
    VC: Codec<V>,
    W: Write,
{
    let mut line = String::new();
    let mut written = 0;

    for (key, value) in list.iter() {
        line.clear();
        key_codec.encode(key, &mut line);
        line.push(FIELD_DELIMITER);
        value_codec.encode(value, &mut line);
        line.push(RECORD_TERMINATOR);
        line.push('\n');

        out.write_all(line.as_bytes())?;
        written += 1;
    }

    out.flush()?;
    Ok(written)
}

/// Reads `key:value;` lines until end of input, decoding what it can.
pub fn read_records<K, V, KC, VC, Rd>(
    key_codec: &KC,
    value_codec: &VC,
    mut input: Rd,
) -> io::Result<Decoded<K, V>>
where
    KC: Codec<K>,
    VC: Codec<V>,
    Rd: BufRead,
{
    let mut records = Vec::new();
    let mut report = LoadReport::default();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let Ok(line) = std::str::from_utf8(&buf) else {
            report.malformed += 1;
            debug!(line = line_no, "skipping non-UTF-8 record");
            continue;
        };
        let line = line.trim_end_matches(['\n', '\r']);

        let Some((key_text, value_text)) = split_record(line) else {
            report.malformed += 1;
            debug!(line = line_no, "skipping malformed record");
            continue;
        };

        let key = match key_codec.decode(key_text) {
            Ok(key) => key,
            Err(err) => {
                report.key_parse_failures += 1;
                warn!(line = line_no, %err, "skipping record with undecodable key");
                continue;
            }
        };

        let value = match value_codec.decode(value_text) {
            Ok(value) => value,
            Err(err) => {
                report.value_parse_failures += 1;
                warn!(line = line_no, %err, "skipping record with undecodable value");
                continue;
            }
        };

        records.push((key, value));
    }

    Ok(Decoded { records, report })
}

// ============================================================================
// FlatFile
// ============================================================================

/// Encoded lines captured from a skip list, ready to be written.
#[derive(Debug, Clone)]
pub struct Snapshot {
    bytes: Vec<u8>,
    records: usize,
}

impl Snapshot {
    /// Number of records captured.
    pub fn records(&self) -> usize {
        self.records
    }

    /// The encoded file contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A `key:value;` file bound to a path and a pair of codecs.
///
/// Every call opens the file, does its work, and closes it again; no handle
/// is kept between calls.
#[derive(Debug, Clone)]
pub struct FlatFile<KC = DisplayCodec, VC = DisplayCodec> {
    path: PathBuf,
    key_codec: KC,
    value_codec: VC,
}

impl FlatFile {
    /// A file at `path` using [`DisplayCodec`] for keys and values.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_codecs(path, DisplayCodec, DisplayCodec)
    }
}

impl Default for FlatFile {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_FILE)
    }
}

impl<KC, VC> FlatFile<KC, VC> {
    /// A file at `path` with explicit codecs.
    pub fn with_codecs(path: impl Into<PathBuf>, key_codec: KC, value_codec: VC) -> Self {
        Self {
            path: path.into(),
            key_codec,
            value_codec,
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes every entry of `list` to the file, replacing its contents.
    ///
    /// Returns the number of records written.
    pub fn dump<K, V, R, Idx>(&self, list: &SkipList<K, V, R, Idx>) -> Result<usize>
    where
        Idx: Index,
        KC: Codec<K>,
        VC: Codec<V>,
    {
        let file = File::create(&self.path).map_err(|err| Error::io(&self.path, err))?;
        let written = write_records(
            list,
            &self.key_codec,
            &self.value_codec,
            BufWriter::new(file),
        )
        .map_err(|err| Error::io(&self.path, err))?;

        debug!(path = %self.path.display(), records = written, "dumped skip list");
        Ok(written)
    }

    /// Inserts every valid record of the file into `list`.
    pub fn load<K, V, R, Idx>(&self, list: &mut SkipList<K, V, R, Idx>) -> Result<LoadReport>
    where
        K: Ord,
        R: RngCore,
        Idx: Index,
        KC: Codec<K>,
        VC: Codec<V>,
    {
        let report = self.read()?.apply(list);
        self.log_load(&report);
        Ok(report)
    }

    /// Reads and decodes the file without touching any skip list.
    pub fn read<K, V>(&self) -> Result<Decoded<K, V>>
    where
        KC: Codec<K>,
        VC: Codec<V>,
    {
        let file = File::open(&self.path).map_err(|err| Error::io(&self.path, err))?;
        read_records(&self.key_codec, &self.value_codec, BufReader::new(file))
            .map_err(|err| Error::io(&self.path, err))
    }

    /// Encodes `list` in memory without touching the file.
    pub fn snapshot<K, V, R, Idx>(&self, list: &SkipList<K, V, R, Idx>) -> Result<Snapshot>
    where
        Idx: Index,
        KC: Codec<K>,
        VC: Codec<V>,
    {
        let mut bytes = Vec::new();
        let records = write_records(list, &self.key_codec, &self.value_codec, &mut bytes)
            .map_err(|err| Error::io(&self.path, err))?;
        Ok(Snapshot { bytes, records })
    }

    /// Writes a snapshot to the file, replacing its contents.
    pub fn write_snapshot(&self, snapshot: &Snapshot) -> Result<usize> {
        fs::write(&self.path, &snapshot.bytes).map_err(|err| Error::io(&self.path, err))?;
        debug!(
            path = %self.path.display(),
            records = snapshot.records,
            "dumped skip list"
        );
        Ok(snapshot.records)
    }

    pub(crate) fn log_load(&self, report: &LoadReport) {
        debug!(
            path = %self.path.display(),
            inserted = report.inserted,
            duplicates = report.duplicates,
            skipped = report.skipped(),
            "loaded skip list"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn make_list() -> SkipList<i32, String> {
        SkipList::new(8, SmallRng::seed_from_u64(12345))
    }

    fn decode(input: &str) -> Decoded<i32, String> {
        read_records(&DisplayCodec, &DisplayCodec, input.as_bytes()).unwrap()
    }

    #[test]
    fn split_record_cases() {
        assert_eq!(split_record("1:a;"), Some(("1", "a")));
        assert_eq!(split_record("1:a"), Some(("1", "a")));
        assert_eq!(split_record(" 7 :x y;"), Some((" 7 ", "x y")));
        assert_eq!(split_record(" k:v;"), Some((" k", "v")));
        assert_eq!(split_record("1:a:b;"), Some(("1", "a:b")));
        assert_eq!(split_record("1:a;;"), Some(("1", "a;")));
        assert_eq!(split_record("1:a; "), Some(("1", "a")));

        assert_eq!(split_record(""), None);
        assert_eq!(split_record("no delimiter"), None);
        assert_eq!(split_record(":a;"), None);
        assert_eq!(split_record("  :a;"), None);
        assert_eq!(split_record("1:;"), None);
        assert_eq!(split_record("1:"), None);
        assert_eq!(split_record("1:  ;"), None);
    }

    #[test]
    fn write_records_format() {
        let mut list = make_list();
        list.insert(5, "a".into());
        list.insert(1, "b".into());
        list.insert(3, "c".into());

        let mut out = Vec::new();
        let written = write_records(&list, &DisplayCodec, &DisplayCodec, &mut out).unwrap();

        assert_eq!(written, 3);
        assert_eq!(String::from_utf8(out).unwrap(), "1:b;\n3:c;\n5:a;\n");
    }

    #[test]
    fn write_records_empty() {
        let list = make_list();
        let mut out = Vec::new();

        assert_eq!(
            write_records(&list, &DisplayCodec, &DisplayCodec, &mut out).unwrap(),
            0
        );
        assert!(out.is_empty());
    }

    #[test]
    fn read_records_valid_lines() {
        let decoded = decode("1:b;\n3:c;\r\n5:a\n");

        assert_eq!(
            decoded.records,
            vec![(1, "b".into()), (3, "c".into()), (5, "a".into())]
        );
        assert_eq!(decoded.report, LoadReport::default());
    }

    #[test]
    fn read_records_skips_malformed() {
        let decoded = decode("\nnodelim\n:empty-key;\n4:;\n2:two;\n");

        assert_eq!(decoded.records, vec![(2, "two".into())]);
        assert_eq!(decoded.report.malformed, 4);
        assert_eq!(decoded.report.skipped(), 4);
    }

    #[test]
    fn read_records_skips_bad_keys() {
        let decoded = decode("x:one;\n99999999999:big;\n-3:neg;\n");

        assert_eq!(decoded.records, vec![(-3, "neg".into())]);
        assert_eq!(decoded.report.key_parse_failures, 2);
        assert_eq!(decoded.report.malformed, 0);
    }

    #[test]
    fn padded_integer_keys_still_decode() {
        let decoded = decode(" 7 :seven;\n\t8:eight;\n");

        assert_eq!(decoded.records, vec![(7, "seven".into()), (8, "eight".into())]);
        assert_eq!(decoded.report, LoadReport::default());
    }

    #[test]
    fn string_keys_keep_whitespace() {
        let mut list: SkipList<String, String> = SkipList::new(4, SmallRng::seed_from_u64(5));
        list.insert(" k".into(), "v".into());
        list.insert("k".into(), "w".into());
        list.insert("k ".into(), "x".into());

        let mut out = Vec::new();
        write_records(&list, &DisplayCodec, &DisplayCodec, &mut out).unwrap();

        let decoded: Decoded<String, String> =
            read_records(&DisplayCodec, &DisplayCodec, out.as_slice()).unwrap();
        let mut restored: SkipList<String, String> =
            SkipList::new(4, SmallRng::seed_from_u64(6));
        let report = decoded.apply(&mut restored);

        assert_eq!(report.inserted, 3);
        assert_eq!(report.duplicates, 0);
        assert!(restored.iter().eq(list.iter()));
    }

    #[test]
    fn padded_decode_error_names_original_text() {
        let err = <DisplayCodec as Codec<i32>>::decode(&DisplayCodec, " x ").unwrap_err();
        assert_eq!(err.text, " x ");
    }

    #[test]
    fn read_records_skips_bad_values() {
        let decoded: Decoded<i32, u8> =
            read_records(&DisplayCodec, &DisplayCodec, "1:300;\n2:7;\n".as_bytes()).unwrap();

        assert_eq!(decoded.records, vec![(2, 7)]);
        assert_eq!(decoded.report.value_parse_failures, 1);
    }

    #[test]
    fn read_records_skips_invalid_utf8() {
        let input: &[u8] = b"1:\xff\xfe;\n2:ok;\n";
        let decoded: Decoded<i32, String> =
            read_records(&DisplayCodec, &DisplayCodec, input).unwrap();

        assert_eq!(decoded.records, vec![(2, "ok".into())]);
        assert_eq!(decoded.report.malformed, 1);
    }

    #[test]
    fn apply_counts_duplicates() {
        let mut list = make_list();
        list.insert(1, "existing".into());

        let report = decode("1:new;\n2:b;\n2:c;\n").apply(&mut list);

        assert_eq!(report.inserted, 1);
        assert_eq!(report.duplicates, 2);
        assert_eq!(list.get(&1), Some(&"existing".into()));
        assert_eq!(list.get(&2), Some(&"b".into()));
    }

    #[test]
    fn fn_codec_round_trip() {
        let hex = FnCodec::new(
            |v: &u32, out: &mut String| {
                let _ = write!(out, "{v:x}");
            },
            |s: &str| u32::from_str_radix(s, 16).map_err(|e| DecodeError::new(s, e)),
        );

        let mut list: SkipList<u32, String> = SkipList::new(4, SmallRng::seed_from_u64(1));
        list.insert(255, "ff".into());
        list.insert(16, "ten".into());

        let mut out = Vec::new();
        write_records(&list, &hex, &DisplayCodec, &mut out).unwrap();
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "10:ten;\nff:ff;\n");

        let decoded: Decoded<u32, String> =
            read_records(&hex, &DisplayCodec, out.as_slice()).unwrap();
        assert_eq!(decoded.records, vec![(16, "ten".into()), (255, "ff".into())]);
    }

    #[test]
    fn snapshot_matches_dump_format() {
        let mut list = make_list();
        list.insert(2, "b".into());
        list.insert(1, "a".into());

        let snapshot = FlatFile::new("unused").snapshot(&list).unwrap();

        assert_eq!(snapshot.records(), 2);
        assert_eq!(snapshot.as_bytes(), b"1:a;\n2:b;\n");
    }

    #[test]
    fn default_path() {
        assert_eq!(FlatFile::default().path(), Path::new(DEFAULT_STORE_FILE));
    }

    #[test]
    fn decode_error_message() {
        let err = DecodeError::new("abc", "invalid digit found in string");
        assert_eq!(
            err.to_string(),
            "cannot decode \"abc\": invalid digit found in string"
        );
    }
}
