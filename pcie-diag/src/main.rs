use std::io::{self, IsTerminal, Write};
use std::process;

use anyhow::{Context, Result};
use clap::{App, Arg, ArgMatches};

use pcie_diag::config::Settings;
use pcie_diag::report::{self, Style};
use pcie_diag::{
    baseline, compare, live_records, DeviceSource, Lspci, RecordSet, TextFile, Verdict,
};

fn app() -> App<'static, 'static> {
    App::new("pcie-diag")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Show PCIe link state from lspci, dump it as a baseline, or compare it with one.")
        .arg(
            Arg::with_name("MODE")
                .long("mode")
                .takes_value(true)
                .possible_values(&["show", "dump", "compare"])
                .default_value("show"),
        )
        .arg(
            Arg::with_name("CONFIG")
                .long("config")
                .takes_value(true)
                .help("Baseline file to compare against, required when --mode=compare"),
        )
        .arg(
            Arg::with_name("INPUT")
                .long("input")
                .takes_value(true)
                .help("Read captured `lspci -Dvvvnn` output instead of running lspci"),
        )
        .arg(
            Arg::with_name("SETTINGS")
                .long("settings")
                .takes_value(true)
                .help("TOML settings file"),
        )
        .arg(
            Arg::with_name("NO_COLOR")
                .long("no-color")
                .help("Disable colored compare output"),
        )
        .arg(
            Arg::with_name("VERBOSE")
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("Increase logging level once for each arg."),
        )
}

fn emit(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .context("failed to write report")
}

fn device_source(matches: &ArgMatches, settings: &Settings) -> Box<dyn DeviceSource> {
    match matches.value_of("INPUT") {
        Some(path) => Box::new(TextFile::new(path)),
        None => Box::new(Lspci::new(settings.enumerator.program.clone())),
    }
}

fn run(matches: &ArgMatches, settings: Settings) -> Result<i32> {
    let mode = matches.value_of("MODE").unwrap_or("show");

    // Argument errors are reported before anything is enumerated.
    let baseline_path = match (mode, matches.value_of("CONFIG")) {
        ("compare", None) => {
            // Printed directly so that a quiet log level cannot hide it.
            eprintln!("[ERROR] --config is required when --mode=compare");
            return Ok(1);
        }
        (_, path) => path,
    };

    let source = device_source(matches, &settings);
    let records = live_records(source.as_ref()).context("failed to enumerate PCI devices")?;

    match (mode, baseline_path) {
        ("dump", _) => {
            emit(&report::dump_table(&records)?)?;
            Ok(0)
        }
        ("compare", Some(path)) => {
            let expected = baseline::load(path)?;
            let live: RecordSet = records.iter().collect();
            let diffs = compare(&expected, &live);
            let verdict = Verdict::from_diffs(&diffs);
            log::info!(
                "compared {} baseline entries against {} devices: {}",
                expected.len(),
                live.len(),
                verdict
            );

            let color = settings
                .report
                .color
                .unwrap_or_else(|| io::stdout().is_terminal())
                && !matches.is_present("NO_COLOR");
            emit(&report::compare_report(&diffs, &Style { color }))?;
            Ok(verdict.exit_code())
        }
        _ => {
            emit(&report::show_table(&records))?;
            Ok(0)
        }
    }
}

fn main() {
    let matches = app().get_matches();

    let settings = matches.value_of("SETTINGS").map(Settings::load).transpose();

    let verbose = matches.occurrences_of("VERBOSE");
    let base_level = match settings {
        Ok(Some(ref settings)) => settings
            .log
            .level
            .map(log::LevelFilter::from)
            .unwrap_or_else(common::output_level),
        _ => common::output_level(),
    };
    let log_level = common::level_from_verbosity(base_level, verbose);

    common::setup_logging("pcie-diag", log_level, common::file_level());

    let code = match settings
        .map_err(anyhow::Error::from)
        .and_then(|settings| run(&matches, settings.unwrap_or_default()))
    {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[ERROR] pcie-diag: {:#}", err);
            1
        }
    };

    process::exit(code);
}
