use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use reqwest::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use url::Url;

use deaddrop::wire::media_type::MediaType;

#[derive(Parser)]
#[command(name = "deaddrop-cli")]
#[command(about = "Upload files to and fetch files from a dead drop server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: Url,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file and print its drop ID
    Put {
        file: PathBuf,
        /// Content type to store (guessed from the file name by default)
        #[arg(long)]
        content_type: Option<String>,
        /// Filename recorded for the download (the file's own name by default)
        #[arg(long)]
        filename: Option<String>,
    },
    /// Download a drop
    Get {
        id: String,
        /// Where to write the body (the server's suggested filename by default)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Deserialize)]
struct CaptureResponse {
    id: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Put {
            file,
            content_type,
            filename,
        } => {
            let content_type = content_type.unwrap_or_else(|| {
                mime_guess::from_path(&file)
                    .first_or_octet_stream()
                    .to_string()
            });
            let filename = filename
                .or_else(|| file.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "upload".to_string());
            let disposition = format!(
                "attachment; filename=\"{}\"",
                filename.replace('\\', "\\\\").replace('"', "\\\"")
            );

            let body = tokio::fs::File::open(&file).await?;
            let res = client
                .post(cli.url.join("deaddrop")?)
                .header(CONTENT_TYPE, HeaderValue::from_str(&content_type)?)
                .header(CONTENT_DISPOSITION, HeaderValue::from_str(&disposition)?)
                .body(reqwest::Body::wrap_stream(file_stream(body)))
                .send()
                .await?;

            if !res.status().is_success() {
                return report_failure(res).await;
            }
            let capture: CaptureResponse = res.json().await?;
            println!("{}", capture.id);
        }
        Commands::Get { id, output } => {
            let res = client
                .get(cli.url.join(&format!("deaddrop/{}", id))?)
                .send()
                .await?;

            if !res.status().is_success() {
                return report_failure(res).await;
            }

            let output = output.unwrap_or_else(|| {
                let suggested = res
                    .headers()
                    .get(CONTENT_DISPOSITION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| MediaType::parse(v).ok())
                    .and_then(|d| d.param("filename").map(str::to_string))
                    .unwrap_or_else(|| format!("{}.data", id));
                // never write outside the current directory
                PathBuf::from(
                    Path::new(&suggested)
                        .file_name()
                        .map(|n| n.to_os_string())
                        .unwrap_or_else(|| format!("{}.data", id).into()),
                )
            });

            let mut out = tokio::fs::File::create(&output).await?;
            let mut body = res.bytes_stream();
            let mut written = 0u64;
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                out.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            out.flush().await?;
            eprintln!("Saved {} bytes to {}", written, output.display());
        }
    }

    Ok(())
}

/// Stream a file in chunks instead of reading it into memory.
fn file_stream(
    file: tokio::fs::File,
) -> impl futures_util::Stream<Item = std::io::Result<bytes::Bytes>> {
    futures_util::stream::try_unfold(file, |mut file| async move {
        use tokio::io::AsyncReadExt;
        let mut buf = bytes::BytesMut::with_capacity(64 * 1024);
        let n = file.read_buf(&mut buf).await?;
        Ok::<_, std::io::Error>((n > 0).then(|| (buf.freeze(), file)))
    })
}

async fn report_failure(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    eprintln!("Error: server returned status {}", status);
    if let Ok(text) = res.text().await {
        eprintln!("Response: {}", text);
    }
    std::process::exit(1);
}
