use spine2d_core::{Skeleton, SkeletonData, build_draw_list};
use std::{env, fs, path::Path};

const SAMPLE: &str = r#"
{
  "skeleton": { "spine": "4.2.43" },
  "bones": [ { "name": "root" } ],
  "slots": [
    { "name": "mask", "bone": "root", "attachment": "mask" },
    { "name": "body", "bone": "root", "attachment": "body" }
  ],
  "skins": [
    {
      "name": "default",
      "attachments": {
        "mask": {
          "mask": {
            "type": "clipping",
            "end": "body",
            "vertexCount": 6,
            "vertices": [0, 0, 100, 0, 100, 50, 50, 50, 50, 100, 0, 100]
          }
        },
        "body": { "body": { "x": 50, "y": 50, "width": 80, "height": 80 } }
      }
    }
  ]
}
"#;

fn usage() -> ! {
    eprintln!("Usage:\n  clip_dump [skeleton.json] [--skin <name|none>]\n");
    std::process::exit(2);
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut path: Option<String> = None;
    let mut skin: Option<String> = None;
    let args = env::args().skip(1).collect::<Vec<_>>();
    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--skin" if i + 1 < args.len() => {
                let v = args[i + 1].as_str();
                skin = (v != "none").then(|| v.to_string());
                i += 2;
            }
            "-h" | "--help" => usage(),
            other if path.is_none() && !other.starts_with('-') => {
                path = Some(other.to_string());
                i += 1;
            }
            _ => usage(),
        }
    }

    let json = match path.as_deref() {
        Some(p) => fs::read_to_string(Path::new(p)).unwrap_or_else(|e| {
            eprintln!("failed to read {p}: {e}");
            std::process::exit(2);
        }),
        None => SAMPLE.to_string(),
    };

    let data = SkeletonData::from_json_str(&json).unwrap_or_else(|e| {
        eprintln!("failed to parse skeleton: {e}");
        std::process::exit(2);
    });

    let mut skeleton = Skeleton::new(data);
    if let Some(skin_name) = skin.as_deref() {
        skeleton.set_skin(Some(skin_name)).unwrap_or_else(|e| {
            eprintln!("failed to set skin {skin_name}: {e}");
            std::process::exit(2);
        });
        skeleton.set_slots_to_setup_pose();
    }
    skeleton.update_world_transform();

    let draw_list = build_draw_list(&skeleton);
    log::info!(
        "{} vertices, {} indices, {} draws",
        draw_list.vertices.len(),
        draw_list.indices.len(),
        draw_list.draws.len()
    );

    match serde_json::to_string_pretty(&draw_list) {
        Ok(out) => println!("{out}"),
        Err(e) => {
            eprintln!("failed to serialize draw list: {e}");
            std::process::exit(1);
        }
    }
}
