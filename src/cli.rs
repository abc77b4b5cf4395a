use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdftools")]
#[command(about = "PDF tools web service, with offline commands for local files")]
#[command(version)]
pub struct Cli {
    /// Defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to bind (overrides PDFTOOLS_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides PDFTOOLS_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show which pages a range expression selects
    Pages {
        /// Range expression (e.g., "1-3,5,7-10")
        expression: String,

        /// Number of pages in the document
        total: usize,
    },

    /// Extract the selected pages to a new PDF
    #[command(alias = "extract")]
    Split {
        /// PDF file to extract from
        path: PathBuf,

        /// Range expression (e.g., "1-5,10,15-20")
        pages: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Combine multiple PDFs into one
    Merge {
        /// PDF files to merge, in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Rotate pages by a multiple of 90 degrees
    Rotate {
        /// PDF file to rotate
        path: PathBuf,

        /// Clockwise rotation in degrees
        #[arg(allow_hyphen_values = true)]
        angle: i64,

        /// Pages to rotate (all when omitted)
        #[arg(long, default_value = "")]
        pages: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Shrink a PDF
    Compress {
        /// PDF file to compress
        path: PathBuf,

        /// high, medium or low
        #[arg(short, long, default_value = "medium")]
        quality: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Case-insensitive keyword search
    #[command(alias = "grep")]
    Search {
        /// Keyword to look for
        keyword: String,

        /// PDF file to search
        path: PathBuf,
    },

    /// Word counts and top keywords as JSON
    Analyze {
        /// PDF file to analyze
        path: PathBuf,
    },
}
