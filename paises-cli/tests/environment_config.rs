//! Runs the `paises` binary with `PAISES_CMDS_*` variables set.

use std::process::{Command, Output};

use camino::Utf8PathBuf;
use paises_core::test_support::sample_countries;
use paises_core::{CountryStore, ProgressReporter, ProgressSink, ProgressSource, SqliteCountryStore};
use paises_fs::DataLayout;
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Sandbox {
    dir: TempDir,
    data_dir: Utf8PathBuf,
}

impl Sandbox {
    fn seeded(self) -> Self {
        let layout = DataLayout::new(self.data_dir.clone());
        layout.ensure_dirs().expect("create data dir");
        let mut store =
            SqliteCountryStore::open(layout.database_path()).expect("open store");
        let countries = sample_countries();
        let mut reporter =
            ProgressReporter::new(ProgressSource::Persist, countries.len(), ProgressSink::discard());
        store
            .upsert(&countries, &mut reporter)
            .expect("seed countries");
        self
    }

    /// The binary, isolated from configuration files outside the sandbox.
    fn paises(&self, args: &[&str], env: &[(&str, &str)]) -> Output {
        let mut command = Command::new(env!("CARGO_BIN_EXE_paises"));
        command
            .args(args)
            .current_dir(self.dir.path())
            .env("HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path())
            .env_remove("RUST_LOG");
        for (key, value) in env {
            command.env(key, value);
        }
        command.output().expect("run paises")
    }
}

#[fixture]
fn sandbox() -> Sandbox {
    let dir = TempDir::new().expect("tempdir");
    let data_dir =
        Utf8PathBuf::from_path_buf(dir.path().join("catalogue")).expect("utf-8 sandbox");
    Sandbox { dir, data_dir }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[rstest]
fn sync_reads_its_environment_section(sandbox: Sandbox) {
    let sandbox = sandbox.seeded();
    let output = sandbox.paises(
        &["sync"],
        &[
            ("PAISES_CMDS_SYNC_DATA_DIR", sandbox.data_dir.as_str()),
            ("PAISES_CMDS_SYNC_OFFLINE", "true"),
        ],
    );

    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output).lines().collect::<Vec<_>>(),
        [
            "Offline mode. Loading from local database.",
            "Successfully loaded 3 countries.",
        ]
    );
}

#[rstest]
fn show_reads_its_environment_section(sandbox: Sandbox) {
    let sandbox = sandbox.seeded();
    let output = sandbox.paises(
        &["show"],
        &[
            ("PAISES_CMDS_SHOW_DATA_DIR", sandbox.data_dir.as_str()),
            ("PAISES_CMDS_SHOW_CODE", "prt"),
        ],
    );

    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).starts_with("Portugal (PRT)\n"), "{}", stdout(&output));
}

#[rstest]
fn missing_code_names_the_environment_variable(sandbox: Sandbox) {
    let output = sandbox.paises(&["show"], &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains("PAISES_CMDS_SHOW_CODE"),
        "{}",
        stderr(&output)
    );
}

#[rstest]
fn offline_start_without_data_exits_with_the_no_data_message(sandbox: Sandbox) {
    let output = sandbox.paises(
        &["sync", "--offline", "--data-dir", sandbox.data_dir.as_str()],
        &[],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output)
            .contains("Could not load data. Please try after connecting to the internet."),
        "{}",
        stderr(&output)
    );
    assert!(DataLayout::new(sandbox.data_dir.clone()).flags_dir().is_dir());
}
