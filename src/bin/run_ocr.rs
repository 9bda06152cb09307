use clap::Parser;
use scanmatch::tools::extract;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "run-ocr", version, about = "Concurrent marker-line extraction over a PDF directory")]
struct Args {
    /// 配置文件路径
    #[arg(long, default_value = "./config.yaml")]
    config: PathBuf,
}

fn main() {
    let args = Args::parse();
    scanmatch::launch(&args.config, extract::DEFAULT_LOG_FILE, extract::run);
}
