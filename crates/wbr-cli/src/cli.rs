use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "wbr",
    about = "Wayback Resolver: look up and load web archive captures",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ./wbr.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Query the capture index
    Query(QueryArgs),
    /// Load the capture of a URL closest to a time
    Load(LoadArgs),
    /// Capture a URL live
    Live(LiveArgs),
    /// Show the fuzzy query derived for a URL
    Rules(RulesArgs),
}

#[derive(Args)]
pub struct QueryArgs {
    pub url: String,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
    #[arg(long)]
    pub closest: Option<String>,
    #[arg(short, long)]
    pub reverse: bool,
    /// exact, prefix, host or domain
    #[arg(short, long, default_value = "exact")]
    pub match_type: String,
    #[arg(long)]
    pub fuzzy: bool,
    /// cdxobject, text or json
    #[arg(short, long, default_value = "cdxobject")]
    pub output: String,
    /// `[!][=|~]field:value`, repeatable
    #[arg(short, long)]
    pub filter: Vec<String>,
}

#[derive(Args)]
pub struct LoadArgs {
    pub url: String,
    #[arg(long)]
    pub closest: Option<String>,
    /// Also write the record body to stdout
    #[arg(long)]
    pub body: bool,
    /// Request header `Name: value`, repeatable
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,
}

#[derive(Args)]
pub struct LiveArgs {
    pub url: String,
    #[arg(long)]
    pub body: bool,
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,
    /// Append the capture to this WARC file (gzipped when it ends in .gz)
    #[arg(long)]
    pub warc: Option<PathBuf>,
}

#[derive(Args)]
pub struct RulesArgs {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query() {
        let cli = Cli::try_parse_from([
            "wbr", "query", "example.com", "-n", "2", "--reverse", "--fuzzy", "-f", "!=statuscode:404",
        ])
        .unwrap();
        let Command::Query(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.url, "example.com");
        assert_eq!(args.limit, Some(2));
        assert!(args.reverse && args.fuzzy);
        assert_eq!(args.match_type, "exact");
        assert_eq!(args.filter, vec!["!=statuscode:404"]);
    }

    #[test]
    fn parse_load_with_headers() {
        let cli = Cli::try_parse_from([
            "wbr", "load", "http://example.com/", "--closest", "2014", "-H", "Origin: http://x", "--body",
        ])
        .unwrap();
        let Command::Load(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.closest.as_deref(), Some("2014"));
        assert_eq!(args.headers, vec!["Origin: http://x"]);
        assert!(args.body);
    }

    #[test]
    fn parse_live_warc() {
        let cli = Cli::try_parse_from(["wbr", "live", "http://example.com/", "--warc", "out.warc.gz"]).unwrap();
        let Command::Live(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.warc, Some(PathBuf::from("out.warc.gz")));
    }

    #[test]
    fn global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["wbr", "rules", "example.com", "--config", "my.toml", "-v"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("my.toml")));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Rules(_)));
    }

    #[test]
    fn missing_url_is_error() {
        assert!(Cli::try_parse_from(["wbr", "query"]).is_err());
    }
}
