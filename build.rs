use std::env;
use std::fs;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=frontend/dist");

    let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") else {
        return;
    };
    let dist_path = Path::new(&manifest_dir).join("frontend/dist");

    if !dist_path.exists() {
        println!("cargo:warning=frontend/dist not found, embedding placeholder page");
        println!("cargo:warning=build the SPA with: cd frontend && npm install && npm run build");

        write_placeholder(&dist_path);
    }
}

// 前端未构建时写入占位页面，保证 rust-embed 目录存在
fn write_placeholder(dist_path: &Path) {
    fs::create_dir_all(dist_path.join("assets")).expect("Failed to create frontend/dist/assets");

    let placeholder = r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>School Portal</title>
    <style>
        body { font-family: system-ui, sans-serif; max-width: 560px; margin: 96px auto; padding: 16px; }
        .notice { background: #eef6ff; border: 1px solid #b6d4fe; padding: 16px 20px; border-radius: 8px; }
        code { background: #f1f3f4; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>School Portal</h1>
    <div class="notice">
        <p>The API is running, but the web interface has not been built.</p>
        <p><code>cd frontend &amp;&amp; npm install &amp;&amp; npm run build</code></p>
        <p>Health check: <code>GET /health</code></p>
    </div>
</body>
</html>"#;

    fs::write(dist_path.join("index.html"), placeholder).expect("Failed to write index.html");
    fs::write(dist_path.join("favicon.ico"), []).expect("Failed to write favicon.ico");
}
