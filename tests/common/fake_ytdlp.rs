//! A stand-in `yt-dlp` executable
//!
//! Behaviour is chosen by a keyword in the URL:
//!
//! | keyword | metadata | download |
//! |---|---|---|
//! | `nomedia` | "No media found" error | - |
//! | `long` | 20 minutes | 4 KiB |
//! | `hosted` | 60 s | 50 KiB |
//! | `huge` | 60 s | 500 KiB |
//! | `broken` | 10 s | partial file, then HTTP 403 |
//! | `slowbroken` | 10 s | waits 0.5 s, then HTTP 403 |
//! | anything else | 30 s | 4 KiB |

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub const KIB: u64 = 1024;

const SCRIPT: &str = r#"#!/bin/sh
out=""
url=""
meta=0
while [ $# -gt 0 ]; do
  case "$1" in
    --dump-single-json) meta=1 ;;
    -o) shift; out="$1" ;;
    -f|--merge-output-format|--progress-template|--cookies) shift ;;
    -*) ;;
    *) url="$1" ;;
  esac
  shift
done

case "$url" in
  *nomedia*) echo "ERROR: [generic] x: No media found" >&2; exit 1 ;;
  *slowbroken*) title="Slow"; duration=10; size=-2 ;;
  *broken*) title="Broken"; duration=10; size=-1 ;;
  *long*) title="Lecture"; duration=1200; size=4096 ;;
  *hosted*) title="Big"; duration=60; size=51200 ;;
  *huge*) title="Huge"; duration=60; size=512000 ;;
  *) title="Dog"; duration=30; size=4096 ;;
esac

if [ "$meta" = 1 ]; then
  printf '{"id":"x","title":"%s","duration":%s,"age_limit":0}\n' "$title" "$duration"
  exit 0
fi

if [ "$size" -lt 0 ]; then
  echo "partial" > "$out"
  [ "$size" = -2 ] && sleep 0.5
  echo "ERROR: HTTP Error 403: Forbidden" >&2
  exit 1
fi

echo "progress:0:$size:NA"
dd if=/dev/zero of="$out" bs=1 count=0 seek="$size" 2>/dev/null
echo "progress:$size:$size:NA"
"#;

/// Write the fake binary into `dir` and return its path
pub fn install_fake_ytdlp(dir: &Path) -> PathBuf {
    let path = dir.join("yt-dlp");
    std::fs::write(&path, SCRIPT).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
