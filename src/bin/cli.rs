//! Boottime command line interface.

use std::{error::Error, process};

use clap::{
    crate_authors, crate_description, crate_name, crate_version, App, AppSettings::*, Arg,
    ArgMatches, SubCommand,
};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, trace, LevelFilter};
use simplelog::*;

use boottime::{self as bt, BootTimeRecord};

fn main() {
    let file_arg = Arg::with_name("FILE")
        .help("history file, one JSON record per line")
        .short("f")
        .long("file")
        .takes_value(true)
        .require_equals(true);
    let pretty_arg = Arg::with_name("PRETTY")
        .help("print an aligned table instead of JSON")
        .short("p")
        .long("pretty");

    let matches = App::new(crate_name!())
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "\n\
            Boottime reads the boot timings the firmware, the boot loader and \
            systemd leave behind and puts them side by side, one column per \
            source:\n\
               \t* the ACPI Firmware Performance Data Table \n\
               \t* the LoaderTime*USec EFI variables \n\
               \t* the `systemd-analyze time` summary \n\
               \t* the systemd manager timestamps over D-Bus \n\
            \n\
            Each `analyze` run appends its record to the history file. Reboot \
            a few times, then use `average` to get the mean of every cell \
            over all recorded boots.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .setting(SubcommandRequiredElseHelp)
        .arg(Arg::with_name("v").short("v").multiple(true).global(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .subcommand(
            SubCommand::with_name("analyze")
                .about("measure the current boot and append it to the history")
                .arg(file_arg.clone())
                .arg(pretty_arg.clone())
                .arg(
                    Arg::with_name("EFIVARS")
                        .help("directory holding the EFI variables")
                        .long("efivars")
                        .takes_value(true)
                        .require_equals(true),
                )
                .arg(
                    Arg::with_name("FPDT")
                        .help("path to the raw ACPI FPDT table")
                        .long("fpdt")
                        .takes_value(true)
                        .require_equals(true),
                )
                .arg(
                    Arg::with_name("MEM")
                        .help("physical memory device the FBPT is read from")
                        .long("mem")
                        .takes_value(true)
                        .require_equals(true),
                )
                .arg(
                    Arg::with_name("ANALYZE_CMD")
                        .help("command printing the boot summary, e.g. \"systemd-analyze time\"")
                        .long("analyze-cmd")
                        .takes_value(true)
                        .require_equals(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("average")
                .about("average all the records of the history")
                .arg(file_arg)
                .arg(pretty_arg),
        )
        .get_matches();

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'boottime -v -v -v' or 'boottime -vvv' vs 'boottime -v'
    let verbosity = matches.occurrences_of("v").max(
        matches
            .subcommand()
            .1
            .map_or(0, |sub| sub.occurrences_of("v")),
    );
    let log_level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    // Logs go to stderr, stdout is reserved for the record.
    if let Err(e) = TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("could not initialise logging: {}", e);
    }

    trace!("{:#?}", matches);

    let result = match matches.subcommand() {
        ("analyze", Some(sub)) => analyze(sub),
        ("average", Some(sub)) => average(sub),
        _ => unreachable!(),
    };

    let exit_code = match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}: {}", style("error").red(), e);
            1
        }
    };
    debug!("exit code: {}", exit_code);
    process::exit(exit_code);
}

fn settings_from(matches: &ArgMatches) -> bt::Settings {
    let mut builder = bt::SettingsBuilder::new();
    if let Some(file) = matches.value_of("FILE") {
        builder = builder.history_file(file);
    }
    if let Some(dir) = matches.value_of("EFIVARS") {
        builder = builder.efivars_dir(dir);
    }
    if let Some(table) = matches.value_of("FPDT") {
        builder = builder.fpdt_table(table);
    }
    if let Some(mem) = matches.value_of("MEM") {
        builder = builder.mem_device(mem);
    }
    if let Some(line) = matches.value_of("ANALYZE_CMD") {
        builder = builder.analyze_command_line(line);
    }
    builder.finalize()
}

fn analyze(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let settings = settings_from(matches);

    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(120);
    pb.set_style(
        ProgressStyle::default_spinner()
            // For more spinners check out the cli-spinners project:
            // https://github.com/sindresorhus/cli-spinners/blob/master/spinners.json
            .tick_strings(&["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"])
            .template("[BT] {spinner:.blue} {msg}"),
    );
    pb.set_message("⏱  Reading boot times...");

    let result = bt::run_analysis(&settings);
    pb.finish_and_clear();

    let record = result?;
    eprintln!(
        "[BT] 👍 record appended to {}",
        style(settings.history_file.display()).green()
    );
    print_record(&record, matches.is_present("PRETTY"))
}

fn average(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let settings = settings_from(matches);
    let record = bt::average_history(&settings.history_file)?;
    print_record(&record, matches.is_present("PRETTY"))
}

fn print_record(record: &BootTimeRecord, pretty: bool) -> Result<(), Box<dyn Error>> {
    if pretty {
        print!("{}", bt::render_table(&record.to_table()));
    } else {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}
