//! HTML rendering for the question form.

use crate::rag::QaAnswer;
use html_escape::{encode_double_quoted_attribute, encode_text};

/// What the page shows besides the form.
#[derive(Debug, Default)]
pub struct PageState<'a> {
    pub url: &'a str,
    pub question: &'a str,
    pub answer: Option<&'a QaAnswer>,
    pub error: Option<&'a str>,
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 46rem; margin: 2rem auto; padding: 0 1rem; color: #222; }
h1 { font-size: 1.6rem; }
label { display: block; margin-top: 1rem; font-weight: 600; }
input[type=text] { width: 100%; padding: .5rem; font-size: 1rem; box-sizing: border-box; }
button { margin-top: 1rem; padding: .5rem 1.25rem; font-size: 1rem; }
button:disabled, input:disabled { opacity: .5; }
textarea { width: 100%; min-height: 8rem; padding: .5rem; font-size: 1rem; box-sizing: border-box; }
.error { margin-top: 1rem; padding: .75rem; background: #fdecea; border: 1px solid #f5c2c0; }
.spinner { margin-top: 1rem; color: #555; }
.sources { font-size: .9rem; color: #444; }
"#;

const SCRIPT: &str = r#"
(function () {
  var form = document.getElementById('qa-form');
  var url = document.getElementById('url');
  var question = document.getElementById('question');
  var submit = document.getElementById('submit');
  var spinner = document.getElementById('spinner');
  function sync() {
    var hasUrl = url.value.trim() !== '';
    question.disabled = !hasUrl;
    submit.disabled = !hasUrl || question.value.trim() === '';
  }
  url.addEventListener('input', sync);
  question.addEventListener('input', sync);
  form.addEventListener('submit', function () {
    spinner.hidden = false;
    submit.disabled = true;
  });
  sync();
})();
"#;

/// Render the single page of the app.
pub fn render_page(state: &PageState<'_>) -> String {
    let has_url = !state.url.trim().is_empty();
    let has_question = !state.question.trim().is_empty();

    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str("<title>Ask a YouTube video</title>\n");
    html.push_str(&format!("<style>{}</style>\n</head>\n<body>\n", STYLE));
    html.push_str("<h1>Ask a YouTube video</h1>\n");

    html.push_str("<form method=\"post\" action=\"/\" id=\"qa-form\">\n");
    html.push_str("<label for=\"url\">YouTube URL</label>\n");
    html.push_str(&format!(
        "<input type=\"text\" id=\"url\" name=\"url\" placeholder=\"https://www.youtube.com/watch?v=...\" value=\"{}\">\n",
        encode_double_quoted_attribute(state.url)
    ));
    html.push_str("<label for=\"question\">Question</label>\n");
    html.push_str(&format!(
        "<input type=\"text\" id=\"question\" name=\"question\" placeholder=\"What is this video about?\" value=\"{}\"{}>\n",
        encode_double_quoted_attribute(state.question),
        if has_url { "" } else { " disabled" }
    ));
    html.push_str(&format!(
        "<button type=\"submit\" id=\"submit\"{}>Submit</button>\n",
        if has_url && has_question { "" } else { " disabled" }
    ));
    html.push_str("<div id=\"spinner\" class=\"spinner\" hidden>Transcribing and thinking, this can take a few minutes...</div>\n");
    html.push_str("</form>\n");

    if let Some(error) = state.error {
        html.push_str(&format!(
            "<div class=\"error\" role=\"alert\">{}</div>\n",
            encode_text(error)
        ));
    }

    if let Some(answer) = state.answer {
        html.push_str("<label for=\"answer\">Answer</label>\n");
        html.push_str(&format!(
            "<textarea id=\"answer\" readonly>{}</textarea>\n",
            encode_text(&answer.answer)
        ));

        if !answer.sources.is_empty() {
            html.push_str("<details class=\"sources\">\n<summary>Sources</summary>\n<ol>\n");
            for source in &answer.sources {
                html.push_str(&format!(
                    "<li><a href=\"{}\">{} @ {}</a><br>{}</li>\n",
                    encode_double_quoted_attribute(&source.url),
                    encode_text(source.title.as_deref().unwrap_or("Untitled")),
                    encode_text(&source.timestamp),
                    encode_text(&source.text)
                ));
            }
            html.push_str("</ol>\n</details>\n");
        }
    }

    html.push_str(&format!("<script>{}</script>\n</body>\n</html>\n", SCRIPT));
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::Source;

    #[test]
    fn test_empty_form_disables_question_and_submit() {
        let html = render_page(&PageState::default());
        assert!(html.contains("name=\"question\" placeholder=\"What is this video about?\" value=\"\" disabled>"));
        assert!(html.contains("<button type=\"submit\" id=\"submit\" disabled>"));
        assert!(!html.contains("id=\"answer\""));
    }

    #[test]
    fn test_url_only_enables_question_but_not_submit() {
        let html = render_page(&PageState {
            url: "https://youtu.be/nM_3d37lmcM",
            ..PageState::default()
        });
        assert!(html.contains("value=\"\">\n<button"));
        assert!(html.contains("<button type=\"submit\" id=\"submit\" disabled>"));
    }

    #[test]
    fn test_both_fields_enable_submit() {
        let html = render_page(&PageState {
            url: "https://youtu.be/nM_3d37lmcM",
            question: "Who is the guest?",
            ..PageState::default()
        });
        assert!(html.contains("<button type=\"submit\" id=\"submit\">"));
    }

    #[test]
    fn test_user_text_is_escaped() {
        let answer = QaAnswer {
            answer: "<b>bold</b> & more".to_string(),
            generated_question: "q".to_string(),
            sources: vec![Source {
                text: "<img src=x>".to_string(),
                title: Some("A \"quoted\" title".to_string()),
                timestamp: "00:00".to_string(),
                url: "https://www.youtube.com/watch?v=nM_3d37lmcM&t=0s".to_string(),
                score: 0.9,
            }],
        };
        let html = render_page(&PageState {
            url: "\"><script>alert(1)</script>",
            question: "<script>alert(2)</script>",
            answer: Some(&answer),
            error: Some("<i>oops</i>"),
        });

        assert!(!html.contains("<script>alert"));
        assert!(!html.contains("<b>bold</b>"));
        assert!(!html.contains("<img src=x>"));
        assert!(!html.contains("<i>oops</i>"));
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt; &amp; more"));
        assert!(html.contains("watch?v=nM_3d37lmcM&amp;t=0s"));
    }
}
