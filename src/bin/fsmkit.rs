use std::process::ExitCode;

use clap::{Arg, ArgMatches, Command};
use tracing::{debug, trace};
use tracing_subscriber::{filter, prelude::*};

use fsmkit::prelude::*;

fn cli() -> clap::Command {
    Command::new("fsmkit")
        .about("Build and reduce finite automata from symbolic descriptions")
        .subcommand_required(true)
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbosity")
                .num_args(0..=1)
                .require_equals(true)
                .value_parser(["info", "debug", "trace"])
                .default_missing_value("info"),
        )
        .subcommand(
            Command::new("build-nfa")
                .about("compiles a regular expression into an epsilon-NFA table")
                .arg(Arg::new("output-file").required(true))
                .arg(Arg::new("regex").required(true)),
        )
        .subcommand(
            Command::new("determinize")
                .about("turns an epsilon-NFA table into an equivalent epsilon-free deterministic one")
                .arg(Arg::new("input-file").required(true))
                .arg(Arg::new("output-file").required(true)),
        )
        .subcommand(
            Command::new("minimize")
                .about("reduces a deterministic mealy or moore machine to its minimal equivalent")
                .arg(Arg::new("kind").required(true))
                .arg(Arg::new("input-file").required(true))
                .arg(Arg::new("output-file").required(true)),
        )
}

fn setup_logging(matches: &ArgMatches) {
    let level = match matches
        .try_get_one::<String>("verbosity")
        .ok()
        .flatten()
        .map(|m| m.as_str())
    {
        Some("trace") => filter::LevelFilter::TRACE,
        Some("debug") => filter::LevelFilter::DEBUG,
        Some("info") => filter::LevelFilter::INFO,
        _ => filter::LevelFilter::WARN,
    };

    let stderr_log = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(stderr_log.with_filter(level))
        .init();

    trace!("setup {level} logging");
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .expect("argument is required")
}

fn run(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    match matches.subcommand() {
        Some(("build-nfa", sub)) => {
            let ast = fsmkit::regex::parse(arg(sub, "regex"))?;
            let nfa = thompson::build(&ast);
            debug!("thompson construction yielded\n{}", nfa.build_transition_table());
            write_nfa_file(arg(sub, "output-file"), &nfa)?;
        }
        Some(("determinize", sub)) => {
            let nfa = read_nfa_file(arg(sub, "input-file"))?;
            let dfa = determinize(&nfa);
            debug!("subset construction yielded\n{}", dfa.build_transition_table());
            write_nfa_file(arg(sub, "output-file"), &dfa)?;
        }
        Some(("minimize", sub)) => match arg(sub, "kind") {
            "moore" => {
                let machine = MooreMachine::read_file(arg(sub, "input-file"))?;
                machine.minimize().write_file(arg(sub, "output-file"))?;
            }
            "mealy" => {
                let machine = MealyMachine::read_file(arg(sub, "input-file"))?;
                machine.minimize().write_file(arg(sub, "output-file"))?;
            }
            kind => return Err(format!("unknown machine kind: {kind}").into()),
        },
        _ => unreachable!(),
    }
    Ok(())
}

pub fn main() -> ExitCode {
    let matches = cli().get_matches();

    setup_logging(&matches);

    if let Err(err) = run(&matches) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
