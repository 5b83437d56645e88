//! Text rendering of a directory tree.
//!
//! The rendered tree is what the model sees as the archive's structure, so
//! the output is deterministic: children are sorted by name at every level,
//! files are prefixed with `-`, directories with `+` and a trailing `/`, and
//! each level is indented two spaces deeper than its parent.
//!
//! ```text
//! - a.txt
//! + img/
//!   - b.png
//! + notes/
//!   - c.pdf
//! ```
//!
//! Unreadable directories never abort the render. They show up as an
//! `ERROR:` line in place of their children.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Options for [`render_tree`].
#[derive(Debug, Clone, Default)]
pub struct TreeOptions {
    /// Deepest level listed. `Some(1)` lists only the root's children and
    /// `Some(0)` lists nothing, leaving an empty tree.
    pub max_depth: Option<usize>,
}

/// Pending step of the depth-first walk.
enum Work {
    /// List the children of `path`, which sits `depth` levels below the root.
    /// `ancestors` holds the canonical paths from the root down to `path`.
    List {
        path: PathBuf,
        depth: usize,
        ancestors: Rc<Vec<PathBuf>>,
    },
    /// Emit a line for a single child
    Entry {
        path: PathBuf,
        name: String,
        depth: usize,
        ancestors: Rc<Vec<PathBuf>>,
    },
}

/// Renders `root` as an indented text tree.
///
/// Symlinks are followed when deciding whether an entry is a file or a
/// directory. Anything that is neither (broken links, sockets) is left out.
/// A directory that resolves to one of its own ancestors is shown but not
/// expanded, so symlink cycles terminate. Other links to a directory listed
/// elsewhere are expanded in full at both places.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use zipsight::tree::{render_tree, TreeOptions};
///
/// let tree = render_tree(Path::new("extracted_files"), &TreeOptions::default());
/// print!("{}", tree);
/// ```
pub fn render_tree(root: &Path, options: &TreeOptions) -> String {
    let mut out = String::new();
    if options.max_depth == Some(0) {
        return out;
    }

    let root_chain: Vec<PathBuf> = fs::canonicalize(root).into_iter().collect();
    let mut stack = vec![Work::List {
        path: root.to_path_buf(),
        depth: 0,
        ancestors: Rc::new(root_chain),
    }];

    while let Some(work) = stack.pop() {
        match work {
            Work::List {
                path,
                depth,
                ancestors,
            } => {
                let indent = indent_for(depth);
                let mut children = match read_child_names(&path) {
                    Ok(children) => children,
                    Err(e) => {
                        out.push_str(&format!(
                            "{}ERROR: Could not access directory {}: {}\n",
                            indent,
                            path.display(),
                            e
                        ));
                        continue;
                    }
                };
                children.sort();

                // Reversed so the smallest name is popped first.
                for name in children.into_iter().rev() {
                    stack.push(Work::Entry {
                        path: path.join(&name),
                        name,
                        depth,
                        ancestors: Rc::clone(&ancestors),
                    });
                }
            }
            Work::Entry {
                path,
                name,
                depth,
                ancestors,
            } => {
                let indent = indent_for(depth);
                let Ok(metadata) = fs::metadata(&path) else {
                    continue;
                };

                if metadata.is_file() {
                    out.push_str(&format!("{}- {}\n", indent, name));
                } else if metadata.is_dir() {
                    out.push_str(&format!("{}+ {}/\n", indent, name));

                    let child_depth = depth + 1;
                    if options.max_depth.is_some_and(|max| child_depth >= max) {
                        continue;
                    }

                    let mut chain = Vec::clone(&ancestors);
                    if let Ok(canonical) = fs::canonicalize(&path) {
                        if chain.contains(&canonical) {
                            out.push_str(&format!(
                                "{}ERROR: Skipping {}: directory loops back to an ancestor\n",
                                indent_for(child_depth),
                                path.display()
                            ));
                            continue;
                        }
                        chain.push(canonical);
                    }

                    stack.push(Work::List {
                        path,
                        depth: child_depth,
                        ancestors: Rc::new(chain),
                    });
                }
            }
        }
    }

    out
}

fn read_child_names(path: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(path)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

fn indent_for(depth: usize) -> String {
    "  ".repeat(depth)
}
