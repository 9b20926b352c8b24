use kb_core::tokenizer::{tokenize, Tokenizer, TokenizerConfig};

#[test]
fn it_lowercases_and_strips_punctuation() {
    let words = tokenize("Ubuzima BWIZA, ni iki? (2024)");
    assert_eq!(words, vec!["ubuzima", "bwiza", "ni", "iki", "2024"]);
}

#[test]
fn it_keeps_non_latin_scripts() {
    let words = tokenize("Привет, мир! 東京 café");
    assert_eq!(words, vec!["привет", "мир", "東京", "café"]);
}

#[test]
fn it_is_idempotent_on_its_output() {
    let tok = Tokenizer::new(&TokenizerConfig::with_extra_chars("'"));
    let samples = [
        "Muraho! Amakuru y'uyu munsi?",
        "  İstanbul\tΣΟΦΙΑ straße ½ ",
        "w'ubuzima -- n'amashuri... 42%",
        "",
    ];
    for s in samples {
        let once = tokenize(s);
        assert_eq!(tokenize(&once.join(" ")), once);
        let once = tok.tokenize(s);
        assert_eq!(tok.tokenize(&once.join(" ")), once);
    }
}
