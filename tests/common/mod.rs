#![allow(dead_code)]

use std::fmt::Write as _;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// One record of a synthetic raw lightcurve file.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub object_id: u64,
    pub band: u8,
    pub sensor_channel: u8,
    pub ra: f64,
    pub dec: f64,
    /// Declared epoch count; `None` declares exactly the written epochs.
    pub declared_epochs: Option<u32>,
    pub epochs: u32,
}

impl RawRecord {
    pub fn new(object_id: u64, band: u8, sensor_channel: u8, ra: f64, dec: f64, epochs: u32) -> Self {
        RawRecord {
            object_id,
            band,
            sensor_channel,
            ra,
            dec,
            declared_epochs: None,
            epochs,
        }
    }

    pub fn declaring(mut self, declared: u32) -> Self {
        self.declared_epochs = Some(declared);
        self
    }
}

/// Render `records` in the raw lightcurve format, with field id 245.
///
/// Every third epoch of a record carries a non-zero catalog flag.
pub fn render_raw(records: &[RawRecord]) -> String {
    let mut out = String::new();
    for r in records {
        let declared = r.declared_epochs.unwrap_or(r.epochs);
        writeln!(
            out,
            "# {} {} {} 245 {} {:.8} {:.8}",
            r.object_id, declared, r.band, r.sensor_channel, r.ra, r.dec
        )
        .unwrap();
        for i in 0..r.epochs {
            let flags = if i % 3 == 2 { 32768 } else { 0 };
            writeln!(
                out,
                "{:.5} {:.3} {:.3} 0.05 {}",
                58200.0 + f64::from(i) * 1.5,
                18.0 + f64::from(i % 5) * 0.1,
                0.02,
                flags
            )
            .unwrap();
        }
    }
    out
}

/// Temporary directory holding one raw file named like a survey field file.
pub struct Fixture {
    pub dir: TempDir,
    pub raw: Utf8PathBuf,
}

impl Fixture {
    pub fn new(records: &[RawRecord]) -> Fixture {
        Fixture::from_text(&render_raw(records))
    }

    pub fn from_text(text: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let base = Utf8Path::from_path(dir.path()).unwrap().to_path_buf();
        let raw = base.join("field000245_ra0to10_dec-30to-20.txt");
        std::fs::write(&raw, text).unwrap();
        Fixture { dir, raw }
    }

    pub fn base(&self) -> &Utf8Path {
        self.raw.parent().unwrap()
    }
}

/// Two records exactly 1.0″ apart in declination, g band and r band, same sensor channel.
pub fn sibling_scenario() -> Vec<RawRecord> {
    vec![
        RawRecord::new(245101100000001, 1, 7, 4.74852, -26.23583, 22),
        RawRecord::new(245201100000001, 2, 7, 4.74852, -26.23583 + 1.0 / 3600.0, 18),
    ]
}
