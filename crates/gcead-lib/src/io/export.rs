use crate::wave::RecInfo;
use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::path::Path;

/// Write the samples of one recording as CSV, one row per tick.
pub fn write_recording_csv(path: &Path, rec: &RecInfo, samples_per_second: u32) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["index", "time_s", "digital", "ead_raw", "ead", "fid_raw", "fid"])?;
    let fs = f64::from(samples_per_second.max(1));
    let rows = rec
        .ead()
        .len()
        .max(rec.fid().len())
        .max(rec.digital().len());
    for i in 0..rows {
        let digital = rec.digital().raw().get(i);
        let ead_raw = rec.ead().raw().get(i);
        let ead = rec.ead().display().get(i);
        let fid_raw = rec.fid().raw().get(i);
        let fid = rec.fid().display().get(i);
        writer.write_record(&[
            i.to_string(),
            (i as f64 / fs).to_string(),
            opt(digital),
            opt(ead_raw),
            opt(ead),
            opt(fid_raw),
            opt(fid),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn opt<T: ToString>(value: Option<&T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use csv::ReaderBuilder;
    use tempfile::tempdir;

    #[test]
    fn writes_one_row_per_sample() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rec.csv");
        let doc = Document::sample_project();
        write_recording_csv(&path, &doc.recordings()[0], 100).unwrap();
        let mut reader = ReaderBuilder::new().from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[1], "time_s");
        let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 600);
        assert_eq!(&rows[100][1], "1");
    }
}
