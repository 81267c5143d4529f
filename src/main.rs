//! qwen-nodes CLI - run the Qwen nodes from a terminal
//!
//! Reads `DASHSCOPE_API_KEY` (and optionally `DASHSCOPE_API_KEY_CHINA`) from
//! the environment or a `.env` file.

use anyhow::{anyhow, bail, Context};
use qwen_nodes::codec;
use qwen_nodes::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_OUTPUT: &str = "output.png";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("🎨 Qwen Nodes - DashScope image generation and vision v{}", qwen_nodes::VERSION);
    println!();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        return;
    }

    let result = match args[1].as_str() {
        "list" => {
            list_nodes();
            Ok(())
        }
        "info" => match args.get(2) {
            Some(id) => {
                node_info(id);
                Ok(())
            }
            None => Err(anyhow!("Please specify a node ID")),
        },
        "generate" => run_generate(&args[2..]),
        "edit" => run_edit(&args[2..]),
        "describe" => run_describe(&args[2..]),
        "help" | "--help" | "-h" => {
            print_usage(&args[0]);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            print_usage(&args[0]);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("❌ {:#}", e);
        if let Some(ApiErrorKind::Configuration) =
            e.downcast_ref::<NodesError>().and_then(NodesError::api_kind)
        {
            eprintln!("   Set DASHSCOPE_API_KEY in the environment or in config/.env");
        }
        std::process::exit(1);
    }
}

fn print_usage(program: &str) {
    println!("Usage: {} <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  list                           List all available nodes");
    println!("  info <node>                    Show detailed info about a node");
    println!("  generate <prompt> [options]    Generate an image from text");
    println!("  edit <prompt> <image>... [options]");
    println!("                                 Edit one to three images");
    println!("  describe <image> [prompt] [options]");
    println!("                                 Describe an image");
    println!("  help                           Show this help message");
    println!();
    println!("Options:");
    println!("  --out <path>        Where to write the result image (default: {})", DEFAULT_OUTPUT);
    println!("  --region <name>     {} (default: {})", Region::names().join(" | "), Region::default());
    println!("  --size <WxH>        {} (generate)", ImageSize::names().join(" | "));
    println!("  --negative <text>   Negative prompt (generate, edit)");
    println!("  --seed <n>          Seed, 0 for random (generate)");
    println!("  --no-extend         Disable prompt extension (generate)");
    println!("  --watermark         Add the DashScope watermark (generate, edit)");
    println!("  --mask <path>       Mask image (edit)");
    println!("  --model <name>      {} (describe)", VisionModel::names().join(" | "));
    println!("  --stream            Stream the description (describe)");
}

// ============================================================================
// Registry Inspection
// ============================================================================

fn registry() -> FilterRegistry {
    registry_with(ApiConfig::load())
}

fn registry_with(config: ApiConfig) -> FilterRegistry {
    FilterRegistry::with_builtins(Arc::new(ApiClient::new(Arc::new(config))))
}

fn list_nodes() {
    let config = ApiConfig::load();
    let key_status = if config.has_api_key() { "configured" } else { "missing" };
    let registry = registry_with(config);
    let grouped = registry.grouped_by_category();

    println!("Available nodes ({} total), API key {}:", registry.len(), key_status);
    println!();

    for (category, nodes) in grouped {
        println!("  📁 {}", category.display_name());
        for metadata in nodes {
            println!("      • {} - {}", metadata.id, metadata.description);
        }
        println!();
    }
}

fn node_info(node_id: &str) {
    let registry = registry();

    let Some(metadata) = registry.get_metadata(node_id) else {
        eprintln!("Node not found: {}", node_id);
        eprintln!("Use 'list' to see available nodes.");
        return;
    };

    println!("Node: {}", metadata.name);
    println!("ID: {}", metadata.id);
    println!("Category: {}", metadata.category.display_name());
    println!("Version: {}", metadata.version);
    println!("Author: {}", metadata.author);
    println!();
    println!("Description:");
    println!("  {}", metadata.description);
    println!();

    if !metadata.inputs.is_empty() {
        println!("Inputs:");
        for port in &metadata.inputs {
            let optional = if port.optional { " (optional)" } else { "" };
            println!("  • {} [{}]{}", port.name, port.port_type.display_name(), optional);
            if !port.description.is_empty() {
                println!("    {}", port.description);
            }
        }
        println!();
    }

    if !metadata.outputs.is_empty() {
        println!("Outputs:");
        for port in &metadata.outputs {
            println!("  • {} [{}]", port.name, port.port_type.display_name());
            if !port.description.is_empty() {
                println!("    {}", port.description);
            }
        }
        println!();
    }

    if !metadata.parameters.is_empty() {
        println!("Parameters:");
        for param in &metadata.parameters {
            let optional = if param.optional { " (optional)" } else { "" };
            println!(
                "  • {} [{}] = {:?}{}",
                param.name,
                param.param_type.display_name(),
                param.default_value,
                optional
            );
            if !param.description.is_empty() {
                println!("    {}", param.description);
            }
            for constraint in &param.constraints {
                println!("    {}", constraint.description());
            }
        }
    }
}

// ============================================================================
// Node Commands
// ============================================================================

/// Positional arguments and node parameters parsed from the command line.
#[derive(Debug)]
struct Invocation {
    positional: Vec<String>,
    parameters: HashMap<String, Value>,
    mask: Option<PathBuf>,
    out: PathBuf,
}

fn parse_invocation(args: &[String]) -> anyhow::Result<Invocation> {
    let mut invocation = Invocation {
        positional: Vec::new(),
        parameters: HashMap::new(),
        mask: None,
        out: PathBuf::from(DEFAULT_OUTPUT),
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value_for = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{} needs a value", flag))
        };

        match arg.as_str() {
            "--out" => invocation.out = PathBuf::from(value_for("--out")?),
            "--mask" => invocation.mask = Some(PathBuf::from(value_for("--mask")?)),
            "--size" => set_string(&mut invocation, "size", value_for("--size")?),
            "--region" => set_string(&mut invocation, "region", value_for("--region")?),
            "--model" => set_string(&mut invocation, "model", value_for("--model")?),
            "--negative" => set_string(&mut invocation, "negative_prompt", value_for("--negative")?),
            "--seed" => {
                let raw = value_for("--seed")?;
                let seed: i64 = raw
                    .parse()
                    .with_context(|| format!("Invalid seed '{}'", raw))?;
                invocation.parameters.insert("seed".to_string(), Value::Integer(seed));
            }
            "--watermark" => {
                invocation.parameters.insert("watermark".to_string(), Value::Boolean(true));
            }
            "--no-extend" => {
                invocation.parameters.insert("prompt_extend".to_string(), Value::Boolean(false));
            }
            "--stream" => {
                invocation.parameters.insert("stream".to_string(), Value::Boolean(true));
            }
            flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
            _ => invocation.positional.push(arg.clone()),
        }
    }

    Ok(invocation)
}

fn set_string(invocation: &mut Invocation, name: &str, value: String) {
    invocation.parameters.insert(name.to_string(), Value::String(value));
}

fn run_generate(args: &[String]) -> anyhow::Result<()> {
    let mut invocation = parse_invocation(args)?;
    if invocation.positional.is_empty() {
        bail!("Usage: generate <prompt> [options]");
    }

    let prompt = invocation.positional.join(" ");
    set_string(&mut invocation, "prompt", prompt);

    println!("⚙️  Generating image...");
    let outputs = run("qwen_text_to_image", HashMap::new(), invocation.parameters)?;
    write_image_output(&outputs, &invocation.out)
}

fn run_edit(args: &[String]) -> anyhow::Result<()> {
    let mut invocation = parse_invocation(args)?;
    if invocation.positional.len() < 2 {
        bail!("Usage: edit <prompt> <image> [image] [image] [options]");
    }

    let prompt = invocation.positional.remove(0);
    set_string(&mut invocation, "prompt", prompt);

    if invocation.positional.len() > 3 {
        bail!("At most 3 images can be edited at once, got {}", invocation.positional.len());
    }

    let mut inputs = HashMap::new();
    for (index, path) in invocation.positional.iter().enumerate() {
        let image = load_image(Path::new(path))?;
        inputs.insert(format!("image{}", index + 1), Value::Image(image));
    }
    if let Some(mask) = &invocation.mask {
        inputs.insert("mask".to_string(), Value::Image(load_image(mask)?));
    }

    println!("⚙️  Editing {} image(s)...", invocation.positional.len());
    let outputs = run("qwen_image_edit", inputs, invocation.parameters)?;
    write_image_output(&outputs, &invocation.out)
}

fn run_describe(args: &[String]) -> anyhow::Result<()> {
    let mut invocation = parse_invocation(args)?;
    if invocation.positional.is_empty() {
        bail!("Usage: describe <image> [prompt] [options]");
    }

    let path = PathBuf::from(invocation.positional.remove(0));
    if !invocation.positional.is_empty() {
        let prompt = invocation.positional.join(" ");
        set_string(&mut invocation, "prompt", prompt);
    }

    let inputs = HashMap::from([("image".to_string(), Value::Image(load_image(&path)?))]);

    println!("🔍 Describing {}...", path.display());
    let outputs = run("qwen_vision_describe", inputs, invocation.parameters)?;

    let description = outputs
        .get("description")
        .and_then(Value::as_string)
        .ok_or_else(|| anyhow!("Node produced no description"))?;
    println!();
    println!("{}", description);
    Ok(())
}

fn run(
    node_id: &str,
    inputs: HashMap<String, Value>,
    parameters: HashMap<String, Value>,
) -> anyhow::Result<HashMap<String, Value>> {
    let registry = registry();
    let node = registry
        .create(node_id)
        .ok_or_else(|| anyhow!("Node not registered: {}", node_id))?;

    Ok(run_node(node.as_ref(), inputs, parameters)?)
}

fn write_image_output(outputs: &HashMap<String, Value>, path: &Path) -> anyhow::Result<()> {
    let image = outputs
        .get("image")
        .and_then(Value::as_image)
        .ok_or_else(|| anyhow!("Node produced no image"))?;

    if let Some(url) = outputs.get("url").and_then(Value::as_string) {
        println!("   • Source: {}", url);
    }

    save_image(image, path)?;
    println!("🎉 Image saved to: {}", path.display());
    Ok(())
}

// ============================================================================
// Image Files
// ============================================================================

fn load_image(path: &Path) -> anyhow::Result<ImageTensor> {
    let image = image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    codec::tensor_from_image(&image).with_context(|| format!("Failed to convert {}", path.display()))
}

fn save_image(tensor: &ImageTensor, path: &Path) -> anyhow::Result<()> {
    let image = codec::image_from_tensor(tensor)?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to save {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_generate_flags() {
        let invocation = parse_invocation(&args(&[
            "a", "red", "bicycle", "--size", "1664*928", "--seed", "42", "--no-extend", "--out", "bike.png",
        ]))
        .unwrap();

        assert_eq!(invocation.positional, vec!["a", "red", "bicycle"]);
        assert_eq!(invocation.parameters["size"], Value::String("1664*928".to_string()));
        assert_eq!(invocation.parameters["seed"], Value::Integer(42));
        assert_eq!(invocation.parameters["prompt_extend"], Value::Boolean(false));
        assert_eq!(invocation.out, PathBuf::from("bike.png"));
        assert!(invocation.mask.is_none());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_invocation(&args(&["cat", "--seed", "lots"])).is_err());
        assert!(parse_invocation(&args(&["cat", "--size"])).is_err());
        assert!(parse_invocation(&args(&["cat", "--blur", "2"])).is_err());
    }

    #[test]
    fn test_default_output_path() {
        let invocation = parse_invocation(&args(&["photo.png", "--stream"])).unwrap();

        assert_eq!(invocation.out, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(invocation.parameters["stream"], Value::Boolean(true));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.png");

        let data = vec![
            1.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0, 1.0, 1.0, 1.0,
        ];
        let tensor = ImageTensor::new(vec![1, 2, 2, 3], data.clone()).unwrap();

        save_image(&tensor, &path).unwrap();
        let loaded = load_image(&path).unwrap();

        assert_eq!(loaded.shape(), &[1, 2, 2, 3]);
        assert_eq!(loaded.data(), data.as_slice());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_image(&dir.path().join("missing.png")).unwrap_err();

        assert!(err.to_string().contains("missing.png"));
    }

    #[test]
    fn test_write_image_output_requires_image() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = HashMap::from([("url".to_string(), Value::String("https://x".to_string()))]);

        assert!(write_image_output(&outputs, &dir.path().join("out.png")).is_err());
    }
}
