use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use wbr_sdk::{
    Archive, ArchiveConfig, CdxEntry, CdxQuery, FuzzyRuleSet, LoadedRecord, MatchType, OutputForm,
    RecordHeaders, RequestContext,
};

use crate::cli::*;

const DEFAULT_CONFIG: &str = "wbr.toml";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Query(args) => cmd_query(config, args),
        Command::Load(args) => cmd_load(config, args),
        Command::Live(args) => cmd_live(config, args),
        Command::Rules(args) => cmd_rules(config, args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ArchiveConfig> {
    let path = match path {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG).is_file() => Path::new(DEFAULT_CONFIG),
        None => {
            tracing::debug!("no config file, using defaults");
            return Ok(ArchiveConfig::default());
        }
    };
    tracing::debug!(path = %path.display(), "using config file");
    ArchiveConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

fn cmd_query(config: ArchiveConfig, args: QueryArgs) -> anyhow::Result<()> {
    let archive = Archive::open(config)?;
    tracing::info!(url = %args.url, "query");

    let output: OutputForm = args.output.parse()?;
    let mut query = CdxQuery::new(args.url)
        .with_match_type(args.match_type.parse::<MatchType>()?)
        .with_output(output);
    if let Some(limit) = args.limit {
        query = query.with_limit(limit);
    }
    if let Some(closest) = args.closest {
        query = query.with_closest(closest);
    }
    if args.reverse {
        query = query.reversed();
    }
    if args.fuzzy {
        query = query.fuzzy();
    }
    for filter in args.filter {
        query = query.with_filter(filter);
    }

    let entries = archive.query(&query)?;
    for entry in &entries {
        match output {
            OutputForm::CdxObject => print_entry(entry),
            OutputForm::Text | OutputForm::Json => println!("{}", entry.render(output)),
        }
    }
    if output == OutputForm::CdxObject {
        println!("{} {} captures", "✓".green(), entries.len().to_string().bold());
    }
    Ok(())
}

fn cmd_load(config: ArchiveConfig, args: LoadArgs) -> anyhow::Result<()> {
    let archive = Archive::open(config)?;
    let request = request_context(&args.headers)?;
    let (entry, record) = archive.lookup(&args.url, args.closest.as_deref(), &request)?;
    print_entry(&entry);
    print_record(record, args.body)
}

fn cmd_live(mut config: ArchiveConfig, args: LiveArgs) -> anyhow::Result<()> {
    config.live.enabled = true;
    let archive = Archive::open(config)?;
    let request = request_context(&args.headers)?;
    let (entry, record) = archive.live_capture(&args.url, &request)?;
    print_entry(&entry);

    let Some(path) = args.warc else {
        return print_record(record, args.body);
    };

    let (mut headers, mut body) = record.into_parts();
    let bytes = body.read_all().context("reading live response")?;
    for name in ["Link", "Memento-Datetime", "WARC-Coll"] {
        headers.remove(name);
    }
    let gzip = path.extension().is_some_and(|ext| ext == "gz");
    let (offset, length) = wbr_warc::append_record(&path, &headers, &bytes, gzip)?;
    tracing::info!(path = %path.display(), offset, length, "appended live capture");
    print_headers(&headers);
    println!(
        "{} Wrote {} bytes at offset {} to {}",
        "✓".green().bold(),
        length.to_string().bold(),
        offset.to_string().bold(),
        path.display()
    );
    Ok(())
}

fn cmd_rules(config: ArchiveConfig, args: RulesArgs) -> anyhow::Result<()> {
    let rules = match &config.rules.file {
        Some(path) => FuzzyRuleSet::load(path)?,
        None => FuzzyRuleSet::default_rules()?,
    };
    let query = CdxQuery::new(args.url).fuzzy();
    let key = query.url_key()?;
    println!("Key: {}", key.key.cyan());

    match rules.match_query(&query) {
        Some(derived) => {
            println!("{} Fuzzy query", "→".green());
            println!("  URL:   {}", derived.url.bold());
            println!("  Match: {}", derived.match_type.to_string().yellow());
            for filter in &derived.filters {
                println!("  Filter: {}", filter.blue());
            }
        }
        None => println!("No fuzzy rule applies."),
    }
    Ok(())
}

fn request_context(headers: &[String]) -> anyhow::Result<RequestContext> {
    let mut request = RequestContext::default();
    for header in headers {
        let Some((name, value)) = RecordHeaders::parse_line(header) else {
            bail!("invalid header {header:?}, expected `Name: value`");
        };
        request.headers.set(name, value);
    }
    Ok(request)
}

fn print_entry(entry: &CdxEntry) {
    println!(
        "{} {} {} {} {}",
        entry.timestamp.yellow(),
        entry.original.bold(),
        entry.statuscode,
        entry.mimetype.dimmed(),
        entry.filename.dimmed()
    );
}

fn print_headers(headers: &RecordHeaders) {
    for (name, value) in headers.iter() {
        println!("  {}: {}", name.cyan(), value);
    }
}

fn print_record(record: LoadedRecord, with_body: bool) -> anyhow::Result<()> {
    let (headers, mut body) = record.into_parts();
    print_headers(&headers);
    if !with_body {
        body.close();
        return Ok(());
    }

    println!();
    let mut stdout = std::io::stdout().lock();
    for chunk in body.by_ref() {
        stdout.write_all(&chunk.context("reading record body")?)?;
    }
    stdout.flush()?;
    Ok(())
}
