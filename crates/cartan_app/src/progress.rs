use indicatif::ProgressStyle;

/// Progress bar in the style
/// `<prefix> ####.... <pos>/<len> iterations, <message>`
pub fn iteration_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:.bold.dim} {bar:.cyan/blue} {human_pos}/{human_len} iterations, {wide_msg}",
    )
    .unwrap()
}

/// Progress bar in the style
/// `<prefix> . <message>`
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:.bold.dim} {spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
}
