//! `show` command: print one stored country and the location of its flag.

use std::fmt::Write as _;
use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use paises_core::{Country, CountryStore, SqliteCountryStore};
use paises_fs::{DataLayout, is_non_empty_file};
use serde::{Deserialize, Serialize};

use crate::{ARG_DATA_DIR, ARG_SHOW_CODE, CliError, DEFAULT_DATA_DIR, ENV_SHOW_CODE};

/// CLI arguments for the `show` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "show", about = "Print a stored country")]
#[ortho_config(prefix = "PAISES")]
pub(crate) struct ShowArgs {
    /// ISO 3166-1 alpha-3 code, e.g. PRT.
    #[arg(value_name = "code")]
    #[serde(default)]
    pub(crate) code: Option<String>,
    /// Directory holding the database and flag images.
    #[arg(long = ARG_DATA_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) data_dir: Option<Utf8PathBuf>,
}

/// Resolved `show` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ShowConfig {
    pub(crate) code: String,
    pub(crate) data_dir: Utf8PathBuf,
}

impl TryFrom<ShowArgs> for ShowConfig {
    type Error = CliError;

    fn try_from(args: ShowArgs) -> Result<Self, Self::Error> {
        let code = args
            .code
            .map(|code| code.trim().to_ascii_uppercase())
            .filter(|code| !code.is_empty())
            .ok_or(CliError::MissingArgument {
                field: ARG_SHOW_CODE,
                env: ENV_SHOW_CODE,
            })?;
        Ok(Self {
            code,
            data_dir: args
                .data_dir
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATA_DIR)),
        })
    }
}

pub(crate) fn run_show(args: ShowArgs, out: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    show_country(&ShowConfig::try_from(merged)?, out)
}

pub(crate) fn show_country(config: &ShowConfig, out: &mut dyn Write) -> Result<(), CliError> {
    let layout = DataLayout::new(config.data_dir.clone());
    let store = SqliteCountryStore::open(layout.database_path())?;
    let country = store
        .read_all()?
        .into_iter()
        .find(|country| country.alpha3_code == config.code)
        .ok_or_else(|| CliError::CountryNotFound {
            code: config.code.clone(),
        })?;
    out.write_all(render_country(&country, &layout).as_bytes())
        .map_err(CliError::WriteOutput)
}

/// The JPEG when present, otherwise the downloaded SVG.
fn flag_path(country: &Country, layout: &DataLayout) -> Option<Utf8PathBuf> {
    let stem = country.file_stem()?;
    [layout.jpg_path(&stem), layout.svg_path(&stem)]
        .into_iter()
        .find(|path| matches!(is_non_empty_file(path), Ok(true)))
}

fn joined<T: ToString>(items: impl IntoIterator<Item = T>) -> String {
    let parts: Vec<String> = items.into_iter().map(|item| item.to_string()).collect();
    if parts.is_empty() {
        "-".to_owned()
    } else {
        parts.join(", ")
    }
}

pub(crate) fn render_country(country: &Country, layout: &DataLayout) -> String {
    let text = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_owned());
    let mut rendered = format!("{} ({})\n", country.label(), country.alpha3_code);
    let rows = [
        ("Native name", text(&country.native_name)),
        ("Capital", text(&country.capital)),
        ("Region", text(&country.region)),
        ("Subregion", text(&country.subregion)),
        ("Population", country.population.to_string()),
        ("Demonym", text(&country.demonym)),
        ("Area (km²)", display_or_unknown(country.area)),
        ("Gini", display_or_unknown(country.gini)),
        ("Calling codes", joined(&country.calling_codes)),
        ("Timezones", joined(&country.timezones)),
        ("Borders", joined(&country.borders)),
        ("Currencies", joined(country.currencies.iter().flatten())),
        ("Languages", joined(country.languages.iter().flatten())),
        ("Regional blocs", joined(country.regional_blocs.iter().flatten())),
        (
            "Flag",
            flag_path(country, layout).map_or_else(|| "not downloaded".to_owned(), String::from),
        ),
    ];
    for (label, value) in rows {
        // Writing into a String cannot fail.
        let _ = writeln!(rendered, "  {label}: {value}");
    }
    rendered
}

fn display_or_unknown(value: f64) -> String {
    if value == 0.0 {
        "unknown".to_owned()
    } else {
        value.to_string()
    }
}
