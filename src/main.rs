use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use essay_feedback::utils::logging;
use essay_feedback::{Action, App, Config, FlowOutcome, ImageAsset};

const USAGE: &str = "用法:
  essay_feedback text <标题> <正文文件>
  essay_feedback images <标题> <图片>... [--corrected <校对后正文文件>]

图片模式（两阶段）下不带 --corrected 时只输出提取文本，
校对后把文本存成文件，再带上 --corrected 重新运行即可评改。";

/// 命令行操作
#[derive(Debug, PartialEq)]
enum Command {
    Text {
        title: String,
        content_path: PathBuf,
    },
    Images {
        title: String,
        image_paths: Vec<PathBuf>,
        corrected_path: Option<PathBuf>,
    },
}

fn parse_args(args: &[String]) -> Result<Command> {
    let (mode, title, rest) = match args {
        [mode, title, rest @ ..] if !rest.is_empty() => (mode.as_str(), title.clone(), rest),
        _ => bail!("{}", USAGE),
    };

    match mode {
        "text" if rest.len() == 1 => Ok(Command::Text {
            title,
            content_path: PathBuf::from(&rest[0]),
        }),
        "images" => {
            let (images, corrected_path) = match rest.iter().position(|a| a == "--corrected") {
                Some(pos) => match &rest[pos + 1..] {
                    [path] => (&rest[..pos], Some(PathBuf::from(path))),
                    _ => bail!("{}", USAGE),
                },
                None => (rest, None),
            };
            if images.is_empty() {
                bail!("{}", USAGE);
            }
            Ok(Command::Images {
                title,
                image_paths: images.iter().map(PathBuf::from).collect(),
                corrected_path,
            })
        }
        _ => bail!("{}", USAGE),
    }
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("读取正文失败: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;

    let app = App::initialize(config).await?;
    let mut session = app.new_session();

    match command {
        Command::Text {
            title,
            content_path,
        } => {
            let content = read_text(&content_path).await?;
            let response = app
                .handle(&mut session, Action::SubmitText { title, content })
                .await?;
            println!("{}", response.display_text());
        }
        Command::Images {
            title,
            image_paths,
            corrected_path,
        } => {
            let mut images = Vec::with_capacity(image_paths.len());
            for path in &image_paths {
                images.push(ImageAsset::load(path).await?);
            }

            let response = app
                .handle(&mut session, Action::ExtractImages { images })
                .await?;
            for warning in &response.warnings {
                warn!("⚠️ {:?}", warning);
            }

            match (&response.outcome, corrected_path) {
                (FlowOutcome::Extracted(_), Some(path)) => {
                    session.edit_extracted_text(read_text(&path).await?)?;
                    info!("✏️ 已使用校对后的正文: {}", path.display());
                    let response = app
                        .handle(&mut session, Action::SubmitCorrected { title })
                        .await?;
                    println!("{}", response.display_text());
                }
                (FlowOutcome::Extracted(text), None) => {
                    println!("{}", text);
                    info!("📝 请校对上面的提取文本，保存后使用 --corrected 重新运行");
                }
                _ => println!("{}", response.display_text()),
            }
        }
    }

    Ok(())
}
