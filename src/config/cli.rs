// Command line surface
// Every flag is optional so that unset flags leave file/env values alone

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "hou", version, about = "Host Objects Ultra-lightly")]
pub struct Cli {
    /// Base directory to serve files from
    #[arg(long = "base", value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Default file served when nothing else matches
    #[arg(long = "default", value_name = "FILE")]
    pub default_file: Option<String>,

    /// Index file looked up inside directories (defaults to --default)
    #[arg(long = "index", value_name = "FILE")]
    pub index_file: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Debug mode: log request headers
    #[arg(short, long)]
    pub debug: bool,

    /// Verbose log
    #[arg(short, long)]
    pub verbose: bool,

    /// Forward every request to this target instead of serving files
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Header added to proxied requests, repeatable
    #[arg(short = 'H', long = "proxy-header", value_name = "KEY:VALUE")]
    pub proxy_headers: Vec<String>,

    /// Configuration file (otherwise hou.* is searched in ., ~/.hou and /etc)
    #[arg(short, long, env = "HOU_CFG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}
