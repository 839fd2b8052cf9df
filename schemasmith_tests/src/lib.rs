#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod model_test;
#[cfg(test)]
mod optimizer_test;
#[cfg(test)]
mod perf_test;
#[cfg(test)]
mod sample_test;
