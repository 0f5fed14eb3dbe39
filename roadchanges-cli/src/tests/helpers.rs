//! Test helpers for laying out diff and region files on disk.

use super::*;
use crate::extract::{ExtractReport, run_extract_with};
use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;

/// A diff creating a bus stop inside the sample region and a crossing
/// outside it.
pub(super) const SAMPLE_DIFF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="Overpass API">
  <action type="create">
    <node id="1" version="1" timestamp="2024-05-01T12:00:00Z" changeset="100" uid="5" user="mapper" lat="5.0" lon="5.0">
      <tag k="highway" v="bus_stop"/>
    </node>
  </action>
  <action type="create">
    <node id="2" version="1" timestamp="2024-05-01T12:05:00Z" changeset="100" uid="5" user="mapper" lat="20.0" lon="20.0">
      <tag k="highway" v="crossing"/>
    </node>
  </action>
  <action type="modify">
    <old>
      <node id="3" version="1" timestamp="2024-04-01T08:00:00Z" changeset="90" uid="4" user="old" lat="6.0" lon="6.0"/>
    </old>
    <new>
      <node id="3" version="2" timestamp="2024-05-01T12:10:00Z" changeset="100" uid="5" user="mapper" lat="6.0" lon="6.0"/>
    </new>
  </action>
</osm>
"#;

/// A region file with the square spanning `(0 0)` to `(10 10)`.
pub(super) const SAMPLE_REGIONS: &str = concat!(
    "downtown,",
    "0103000000010000000500000000000000000000000000000000000000000000",
    "0000002440000000000000000000000000000024400000000000002440000000",
    "0000000000000000000000244000000000000000000000000000000000",
    "\n",
);

/// Temporary directory holding the sample inputs.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        let workspace = Self { _dir: dir, root };
        workspace.write("changes.osc", SAMPLE_DIFF);
        workspace.write("regions.csv", SAMPLE_REGIONS);
        workspace
    }

    pub(super) fn write(&self, name: &str, contents: &str) -> Utf8PathBuf {
        let path = self.root.join(name);
        fs::write(&path, contents).expect("write input file");
        path
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn diff(&self) -> Utf8PathBuf {
        self.path("changes.osc")
    }

    pub(super) fn regions(&self) -> Utf8PathBuf {
        self.path("regions.csv")
    }

    pub(super) fn args(&self) -> ExtractArgs {
        ExtractArgs {
            adiff: Some(self.diff()),
            ..ExtractArgs::default()
        }
    }
}

/// Runs `extract` and returns the report with the emitted text.
pub(super) fn capture(args: ExtractArgs) -> Result<(ExtractReport, String), CliError> {
    let mut buffer = Vec::new();
    let report = run_extract_with(args, &mut buffer)?;
    let text = String::from_utf8(buffer).expect("utf-8 output");
    Ok((report, text))
}
