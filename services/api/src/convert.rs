use clap::Args;
use hpxml_reso::config::AppConfig;
use hpxml_reso::error::AppError;
use hpxml_reso::telemetry;
use hpxml_reso::workflows::geo::GeoServices;
use hpxml_reso::workflows::reso::ResoRecord;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct ConvertArgs {
    /// HPXML file to convert
    pub(crate) infile: PathBuf,
    /// Write the JSON here instead of stdout
    #[arg(short = 'o', long)]
    pub(crate) outfile: Option<PathBuf>,
    /// Building to convert; defaults to the first one in the file
    #[arg(long)]
    pub(crate) bldg_id: Option<String>,
    /// Resolve the address with the geocoding service before normalizing it
    #[arg(long)]
    pub(crate) geocode: bool,
}

pub(crate) fn run_convert(args: ConvertArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let services = GeoServices::from_config(&config.geo)?;
    let converter = services.converter(args.geocode)?;
    let record = converter.convert_path(&args.infile, args.bldg_id.as_deref())?;

    write_record(&record, args.outfile.as_ref())?;
    info!(infile = %args.infile.display(), "conversion complete");
    Ok(())
}

/// The output file is staged beside the target and renamed into place, so a
/// failed write never leaves a partial file behind.
fn write_record(record: &ResoRecord, outfile: Option<&PathBuf>) -> Result<(), AppError> {
    let json = record.to_json_pretty()?;
    let Some(path) = outfile else {
        println!("{json}");
        return Ok(());
    };

    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = NamedTempFile::new_in(dir)?;
    writeln!(staged, "{json}")?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| err.error)?;
    Ok(())
}
