//! Génération des pages HTML d'aperçu pour les albums d'images.
//!
//! La page est écrite à côté des fichiers et référence les médias par leur
//! nom relatif; elle s'ouvre donc hors ligne dans n'importe quel navigateur.
use crate::api::Post;

/// Échappe le texte pour insertion dans du HTML.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Construit la page d'aperçu d'un album à partir des noms de fichiers relatifs.
///
/// Les fichiers `.mp4` (live photos) sont rendus dans un lecteur vidéo,
/// le reste dans des balises image.
pub fn preview_page(post: &Post, files: &[String]) -> String {
    let title = if post.desc.is_empty() {
        format!("{} {}", post.platform, post.id)
    } else {
        post.desc.clone()
    };
    let title = escape_html(&title);

    let mut body = String::new();
    for file in files {
        let src = escape_html(file);
        if file.to_ascii_lowercase().ends_with(".mp4") {
            body.push_str(&format!(
                "    <video controls muted loop src=\"{src}\"></video>\n"
            ));
        } else {
            body.push_str(&format!("    <img src=\"{src}\" alt=\"{src}\">\n"));
        }
    }

    let author = escape_html(&post.author_name);
    let date = escape_html(&post.create_time);

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         <style>\n\
         body {{ background: #111; color: #eee; font-family: sans-serif; \
         max-width: 720px; margin: 0 auto; padding: 1rem; }}\n\
         img, video {{ width: 100%; margin-bottom: 1rem; border-radius: 8px; }}\n\
         header {{ margin-bottom: 1.5rem; }}\n\
         small {{ color: #999; }}\n\
         </style>\n\
         </head>\n\
         <body>\n\
         <header>\n\
         <h1>{title}</h1>\n\
         <small>{author} &middot; {date}</small>\n\
         </header>\n\
         {body}\
         </body>\n\
         </html>\n"
    )
}
