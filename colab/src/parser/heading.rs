const MAX_DEPTH: usize = 6;

#[derive(Debug)]
pub struct Heading {
    pub depth: usize,
    pub content: String,
}

impl Heading {
    pub fn try_parse(line: &str) -> Option<Self> {
        let depth = line.chars().take_while(|ch| *ch == '#').count();

        if depth == 0 || depth > MAX_DEPTH {
            return None;
        }

        let rest = &line[depth..];
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return None;
        }

        let content = rest.trim().trim_end_matches('#').trim_end().to_owned();
        if content.is_empty() {
            return None;
        }

        Some(Self { depth, content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_headings() {
        // When
        let value = Heading::try_parse("### The quick ## brown fox #");

        // Then
        let heading = value.unwrap();
        assert_eq!(heading.depth, 3);
        assert_eq!(heading.content, "The quick ## brown fox");
    }

    #[test]
    fn should_parse_non_headings() {
        assert!(Heading::try_parse("T#he quick brown fox ## jumped over the lazy dog").is_none());
        assert!(Heading::try_parse("#hashtag").is_none());
        assert!(Heading::try_parse("####### too deep").is_none());
        assert!(Heading::try_parse("##").is_none());
    }
}
