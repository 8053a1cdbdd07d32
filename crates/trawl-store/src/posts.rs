use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use trawl_core::repo::PostRepository;
use trawl_core::Post;

use crate::{lock_file, read_json_or_default, write_json, StorePaths};

/// Maximum number of posts kept on disk.
pub const POST_CAP: usize = 2000;

/// On-disk document. Posts and the id index live in one file so they are
/// always replaced together.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PostsFile {
    #[serde(default)]
    posts: Vec<Post>,
    #[serde(default)]
    post_ids: Vec<String>,
}

/// Append-only, first-write-wins post store with a FIFO size cap.
///
/// The id index outlives eviction: an id that was ever stored is never
/// re-added, even after its post has been evicted.
pub struct ContentStore {
    path: PathBuf,
    lock_path: PathBuf,
    cap: usize,
}

impl ContentStore {
    pub fn new(paths: &StorePaths) -> Self {
        Self {
            path: paths.posts_json.clone(),
            lock_path: paths.lock_file.clone(),
            cap: POST_CAP,
        }
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.posts.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<PostsFile> {
        read_json_or_default(&self.path)
    }
}

impl PostRepository for ContentStore {
    fn merge(&self, new_posts: &[Post]) -> Result<usize> {
        let _lock = lock_file(&self.lock_path)?;
        let mut file = self.read()?;

        let mut seen: HashSet<String> = file.post_ids.iter().cloned().collect();
        for p in &file.posts {
            if seen.insert(p.id.clone()) {
                file.post_ids.push(p.id.clone());
            }
        }

        let mut added = 0;
        for post in new_posts {
            if post.id.is_empty() || !seen.insert(post.id.clone()) {
                continue;
            }
            file.post_ids.push(post.id.clone());
            file.posts.push(post.clone());
            added += 1;
        }

        if file.posts.len() > self.cap {
            let excess = file.posts.len() - self.cap;
            file.posts.drain(..excess);
            tracing::debug!(evicted = excess, "post store cap reached");
        }

        write_json(&self.path, &file)?;
        tracing::info!(added, total = file.posts.len(), "stored posts");
        Ok(added)
    }

    fn load(&self) -> Result<Vec<Post>> {
        Ok(self.read()?.posts)
    }
}
