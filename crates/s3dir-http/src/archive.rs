//! Streaming zip assembly.
//!
//! An archive is built from a recursive listing of a prefix. Each object is
//! resolved to a signed URL, fetched, and deflated into its own entry, page by
//! page, so at most one listing page is held at a time. The zip writer writes
//! into a [`Spool`] which is drained into the [`StreamSink`] after every write:
//! small archives end up buffered with a `Content-Length`, large ones stream.
//!
//! The central directory is only written once every entry succeeded. Any earlier
//! failure is returned to the caller, which aborts the sink.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Datelike, Timelike, Utc};
use futures::StreamExt;
use parking_lot::Mutex;
use s3dir_core::path::{relative_name, segment_prefix};
use s3dir_core::{ListingWalker, ObjectRecord, ObjectStore};
use tracing::{debug, info, warn};
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::error::ServeError;
use crate::output::ResponseOutput;
use crate::sink::StreamSink;

/// Name of the downloaded archive: `{bucket}.zip` at the bucket root,
/// `{bucket}_{segment}_..._{segment}.zip` below it.
#[must_use]
pub fn archive_filename(bucket: &str, segments: &[String]) -> String {
    if segments.is_empty() {
        format!("{bucket}.zip")
    } else {
        format!("{bucket}_{}.zip", segments.join("_"))
    }
}

/// Shared byte buffer the zip writer writes into.
#[derive(Debug, Clone, Default)]
pub struct Spool(Arc<Mutex<Vec<u8>>>);

impl Spool {
    /// Take everything written since the last drain.
    #[must_use]
    pub fn drain(&self) -> Bytes {
        Bytes::from(std::mem::take(&mut *self.0.lock()))
    }
}

impl Write for Spool {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Entry names already written to one archive.
///
/// Distinct keys can map to the same entry name (`a/x` and `a//x` both become
/// `x`), and a zip may not repeat a name, so repeats get a ` (n)` suffix before
/// the extension of their final component.
#[derive(Debug, Default)]
struct EntryNames(HashSet<String>);

impl EntryNames {
    fn claim(&mut self, name: String) -> String {
        if self.0.insert(name.clone()) {
            return name;
        }

        let (dir, file) = match name.rsplit_once('/') {
            Some((dir, file)) => (format!("{dir}/"), file),
            None => (String::new(), name.as_str()),
        };
        let (stem, ext) = match file.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
            _ => (file, String::new()),
        };

        let mut n = 1usize;
        loop {
            let candidate = format!("{dir}{stem} ({n}){ext}");
            if self.0.insert(candidate.clone()) {
                warn!(entry = %name, renamed = %candidate, "duplicate archive entry name");
                return candidate;
            }
            n += 1;
        }
    }
}

/// Summary of a finished archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    /// Entries written.
    pub entries: usize,
    /// Uncompressed bytes copied into entries.
    pub bytes: u64,
}

fn zip_timestamp(at: Option<&DateTime<Utc>>) -> zip::DateTime {
    at.and_then(|at| {
        zip::DateTime::from_date_and_time(
            u16::try_from(at.year()).ok()?,
            u8::try_from(at.month()).ok()?,
            u8::try_from(at.day()).ok()?,
            u8::try_from(at.hour()).ok()?,
            u8::try_from(at.minute()).ok()?,
            u8::try_from(at.second()).ok()?,
        )
        .ok()
    })
    .unwrap_or_default()
}

fn entry_options(object: &ObjectRecord) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip_timestamp(object.last_modified.as_ref()))
        .large_file(object.size >= u64::from(u32::MAX))
}

/// Write a zip of every object under `segments` in `bucket` to `sink`, then
/// complete the sink.
///
/// Entry names are the object keys relative to the archive root. Directory
/// markers (keys ending in `/`, or equal to the root itself) are skipped.
pub async fn write_archive<S, O>(
    store: &S,
    bucket: &str,
    segments: &[String],
    sink: &mut StreamSink<'_, O>,
) -> Result<ArchiveStats, ServeError>
where
    S: ObjectStore + ?Sized,
    O: ResponseOutput,
{
    let prefix = segment_prefix(segments);
    let spool = Spool::default();
    let mut zip = ZipWriter::new_stream(spool.clone());
    let mut walker = ListingWalker::new(store, bucket, &prefix, None);
    let mut stats = ArchiveStats::default();
    let mut names = EntryNames::default();

    while let Some(page) = walker.next_page().await? {
        for object in page.objects {
            let name = relative_name(&object.key, segments.len())
                .filter(|_| !object.key.ends_with('/'));
            let Some(name) = name else {
                debug!(bucket, key = %object.key, "skipping directory marker");
                continue;
            };
            let name = names.claim(name);

            let url = store
                .presign_get(bucket, &object.key, None)
                .await
                .map_err(|e| ServeError::store(format!("sign s3://{bucket}/{}", object.key), e))?;
            let mut body = store
                .fetch(&url)
                .await
                .map_err(|e| ServeError::store(format!("fetch s3://{bucket}/{}", object.key), e))?;

            zip.start_file(name.as_str(), entry_options(&object))?;
            sink.write(spool.drain()).await?;

            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|e| {
                    ServeError::store(format!("read s3://{bucket}/{}", object.key), e)
                })?;
                zip.write_all(&chunk)?;
                stats.bytes += chunk.len() as u64;
                sink.write(spool.drain()).await?;
            }

            stats.entries += 1;
            debug!(bucket, entry = %name, size = object.size, "archived object");
        }
    }

    zip.finish()?;
    sink.write(spool.drain()).await?;
    sink.complete().await?;

    info!(
        bucket,
        prefix = %prefix,
        entries = stats.entries,
        bytes = stats.bytes,
        streamed = sink.accepted(),
        "archive complete"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use chrono::TimeZone;
    use s3dir_core::MemoryStore;

    use super::*;
    use crate::output::{RecordingOutput, ResponseHead};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_owned()).collect()
    }

    fn zip_headers(head: &mut ResponseHead) {
        head.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/zip"),
        );
    }

    fn read_entries(data: Vec<u8>) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data)).expect("valid zip");
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).expect("entry");
                let mut content = Vec::new();
                file.read_to_end(&mut content).expect("read entry");
                (file.name().to_owned(), content)
            })
            .collect()
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new().with_page_size(1);
        store.create_bucket("bucket");
        let modified = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 10).unwrap();
        store.put_object("bucket", "a/", Vec::new(), None);
        store.put_object("bucket", "a/x", b"first".to_vec(), Some(modified));
        store.put_object("bucket", "a/y/z", b"second".to_vec(), None);
        store.put_object("bucket", "ab/ignored", b"not under a/".to_vec(), None);
        store
    }

    #[test]
    fn test_should_name_archives_after_path() {
        assert_eq!(archive_filename("bucket", &[]), "bucket.zip");
        assert_eq!(
            archive_filename("bucket", &strings(&["a", "b"])),
            "bucket_a_b.zip"
        );
    }

    #[test]
    fn test_should_convert_timestamps() {
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 10).unwrap();
        let converted = zip_timestamp(Some(&at));
        assert_eq!(converted.year(), 2024);
        assert_eq!(converted.month(), 5);
        assert_eq!(converted.second(), 10);
        assert_eq!(zip_timestamp(None), zip::DateTime::default());

        let too_old = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(zip_timestamp(Some(&too_old)), zip::DateTime::default());
    }

    #[tokio::test]
    async fn test_should_archive_subtree_relative_to_root() {
        let store = store();
        let mut output = RecordingOutput::default();
        let mut sink = StreamSink::new(&mut output, zip_headers);

        let stats = write_archive(&store, "bucket", &strings(&["a"]), &mut sink)
            .await
            .expect("archive");
        assert!(sink.is_flushed());
        drop(sink);

        assert_eq!(stats.entries, 2);
        assert_eq!(stats.bytes, 11);
        assert!(output.header(http::header::CONTENT_LENGTH).is_some());
        assert_eq!(
            read_entries(output.body()),
            vec![
                ("x".to_owned(), b"first".to_vec()),
                ("y/z".to_owned(), b"second".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn test_should_archive_whole_bucket() {
        let store = store();
        let mut output = RecordingOutput::default();
        let mut sink = StreamSink::new(&mut output, zip_headers);

        write_archive(&store, "bucket", &[], &mut sink)
            .await
            .expect("archive");
        drop(sink);

        let names: Vec<_> = read_entries(output.body())
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["a/x", "a/y/z", "ab/ignored"]);
    }

    #[test]
    fn test_should_suffix_repeated_entry_names() {
        let mut names = EntryNames::default();
        assert_eq!(names.claim("x".to_owned()), "x");
        assert_eq!(names.claim("x".to_owned()), "x (1)");
        assert_eq!(names.claim("x".to_owned()), "x (2)");
        assert_eq!(names.claim("d/report.pdf".to_owned()), "d/report.pdf");
        assert_eq!(names.claim("d/report.pdf".to_owned()), "d/report (1).pdf");
        assert_eq!(names.claim(".env".to_owned()), ".env");
        assert_eq!(names.claim(".env".to_owned()), ".env (1)");
    }

    #[tokio::test]
    async fn test_should_archive_keys_with_repeated_slashes() {
        let store = MemoryStore::new();
        store.put_object("bucket", "a/x", b"single".to_vec(), None);
        store.put_object("bucket", "a//x", b"double".to_vec(), None);
        let mut output = RecordingOutput::default();
        let mut sink = StreamSink::new(&mut output, zip_headers);

        let stats = write_archive(&store, "bucket", &strings(&["a"]), &mut sink)
            .await
            .expect("archive");
        drop(sink);

        assert_eq!(stats.entries, 2);
        assert_eq!(
            read_entries(output.body()),
            vec![
                ("x".to_owned(), b"double".to_vec()),
                ("x (1)".to_owned(), b"single".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn test_should_stream_large_archives() {
        let store = store();
        let mut output = RecordingOutput::default();
        let mut sink = StreamSink::new(&mut output, zip_headers).with_capacity(16);

        write_archive(&store, "bucket", &strings(&["a"]), &mut sink)
            .await
            .expect("archive");
        drop(sink);

        assert_eq!(output.heads.len(), 1);
        assert!(output.header(http::header::CONTENT_LENGTH).is_none());
        assert!(output.writes.len() > 1);
        assert_eq!(read_entries(output.body()).len(), 2);
    }

    #[tokio::test]
    async fn test_should_fail_without_flushing_small_output() {
        let store = MemoryStore::new();
        let mut output = RecordingOutput::default();
        let mut sink = StreamSink::new(&mut output, zip_headers);

        let err = write_archive(&store, "missing", &[], &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, ServeError::Listing(_)));
        assert!(!sink.is_flushed());
        assert!(sink.abort().await.is_some());
        drop(sink);
        assert!(output.heads.is_empty());
    }
}
