#[cfg(test)]
mod codec_test;
#[cfg(test)]
mod config_test;
#[cfg(test)]
mod filter_test;
