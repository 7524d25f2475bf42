// External crates
use log::info;
use plotters::prelude::*;

pub struct Statistics;

impl Statistics {
    /// Computes the arithmetic mean (average) of a vector of values.
    ///
    /// # Arguments
    /// * `data` - A reference to a vector of `f64` values representing the
    ///   values for which the mean will be calculated.
    ///
    /// # Returns
    /// A `f64` value representing the average of all elements in `data`.
    ///
    /// # Panics
    /// This function will **panic** if `data` is empty, because division by zero
    /// would occur. Ensure that the input vector contains at least one value.
    ///
    /// # Example
    /// ```
    /// let values = vec![10.0, 20.0, 30.0, 40.0];
    /// let avg = mean(&values);
    /// ```
    pub fn mean(data: &Vec<f64>) -> f64 {
        let sum: f64 = data.iter().sum();
        sum / data.len() as f64
    }

    /// Computes the median value of a vector of values.
    ///
    /// # Arguments
    /// * `data` - A reference to a vector of `f64` values.
    ///
    /// # Returns
    /// A `f64` representing the median of the input data.
    ///
    /// # Panics
    /// This function will **panic** if `data` is empty, because accessing elements
    /// in an empty slice is invalid. Ensure that the vector contains at least one value.
    ///
    /// # Example
    /// ```
    /// let values = vec![5.0, 1.0, 9.0, 3.0, 7.0];
    /// let med = median(&values);
    /// ```
    pub fn median(data: &Vec<f64>) -> f64 {
        let mut sorted = data.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }

    /// Computes the variance of a vector of values.
    ///
    /// # Arguments
    /// * `data` - A reference to a vector of `f64` values whose variance will be computed.
    ///
    /// # Returns
    /// A `f64` representing the variance of the data.
    ///
    /// # Panics
    /// This function will **panic** if `data` is empty, since variance is undefined
    /// for an empty dataset. Ensure the input contains at least one value.
    ///
    /// # Example
    /// ```
    /// let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
    /// let var = Statistics::variance(&values);
    /// ```
    pub fn variance(data: &Vec<f64>) -> f64 {
        let m = Statistics::mean(data);
        data.iter().map(|value| (value - m).powi(2)).sum::<f64>() / data.len() as f64
    }

    /// Computes the standard deviation of a vector of values.
    ///
    /// # Arguments
    /// * `data` - A reference to a vector of `f64` values whose standard deviation will be computed.
    ///
    /// # Returns
    /// A `f64` representing the standard deviation.
    ///
    /// # Panics
    /// This function will **panic** if `data` is empty, since standard deviation
    /// cannot be computed without at least one value.
    ///
    /// # Example
    /// ```
    /// let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
    /// let sd = Statistics::std_dev(&values);
    /// ```
    pub fn std_dev(data: &Vec<f64>) -> f64 {
        Statistics::variance(data).sqrt()
    }

    /// Returns the minimum and maximum values in a vector of values.
    ///
    /// # Arguments
    /// * `data` - A reference to a vector of `f64` values.
    ///
    /// # Returns
    /// A tuple `(min, max)`.
    ///
    /// # Panics
    /// This function will **panic** if the dataset is empty, because computing a
    /// minimum and maximum requires at least one value.
    ///
    /// # Example
    /// ```
    /// let values = vec![12.0, 5.0, 30.0, 7.0, 9.0];
    /// let (min_val, max_val) = Statistics::min_max(&values);
    /// ```
    pub fn min_max(data: &Vec<f64>) -> (f64, f64) {
        let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        (min, max)
    }

    /// Computes the first, second (median), and third quartiles of a vector of values.
    ///
    /// # Arguments
    /// * `data` - A reference to a vector of `f64` values.
    ///
    /// # Returns
    /// A tuple `(q1, q2, q3)`.
    ///
    /// # Panics
    /// This function will **panic** if `data` is empty.
    ///
    /// # Example
    /// ```
    /// let values = vec![7.0, 15.0, 36.0, 39.0, 40.0, 41.0, 42.0, 43.0, 47.0, 49.0];
    /// let (q1, q2, q3) = Statistics::quartiles(&values);
    /// ```
    pub fn quartiles(data: &Vec<f64>) -> (f64, f64, f64) {
        let mut sorted = data.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let n = sorted.len();

        let q2 = Statistics::median(&sorted);
        let q1 = Statistics::median(&sorted[..n / 2].to_vec());
        let q3 = Statistics::median(&sorted[(n + 1) / 2..].to_vec());

        (q1, q2, q3)
    }

    /// Plots a histogram of the given fitness values and saves it as an image file.
    ///
    /// This function divides the range into a fixed number of bins (20),
    /// counts the number of values falling into each bin, and creates a histogram
    /// chart using the `plotters` crate. The Y-axis is scaled based on the maximum
    /// count plus a margin of 5.
    ///
    /// # Arguments
    /// * `values` - A reference to a vector of `f64` values (a generation's fitness scores).
    /// * `filename` - A string slice representing the path where the histogram image
    ///   will be saved.
    ///
    /// # Panics
    /// This function will panic if:
    /// - The values vector is empty.
    /// - Writing the image file fails.
    ///
    /// # Example
    /// ```
    /// let fitnesses = vec![10.0, 20.0, 20.0, 30.0, 40.0, 40.0, 40.0, 50.0];
    /// Statistics::plot_histogram(&fitnesses, "output/histogram.png");
    /// ```
    pub fn plot_histogram(values: &Vec<f64>, filename: &str) {
        let (min, max) = Statistics::min_max(values);

        let root = BitMapBackend::new(filename, (1280, 720)).into_drawing_area();
        root.fill(&WHITE).unwrap();

        let bins = 20;
        let step = ((max - min) / bins as f64).max(1e-9);

        let mut counts: Vec<i128> = Vec::new();

        for b in 0..bins {
            let start = min + b as f64 * step;
            let end = start + step;

            let count = values.iter().filter(|&&v| v >= start && v < end).count() as i128;
            counts.push(count);
        }

        let y_max = counts.iter().max().cloned().unwrap_or(0) + 5;

        let mut chart = ChartBuilder::on(&root)
            .caption("Fitness Distribution", ("sans-serif", 40))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(40)
            .build_cartesian_2d(min..max, 0..y_max)
            .unwrap();

        chart.configure_mesh().draw().unwrap();

        for (b, &count) in counts.iter().enumerate() {
            let start = min + b as f64 * step;
            let end = start + step;

            chart
                .draw_series(std::iter::once(Rectangle::new([(start, 0), (end, count)], BLUE.mix(0.6).filled())))
                .unwrap();
        }
    }

    /// Computes and logs statistical summaries of a generation's fitness values.
    ///
    /// # Arguments
    /// * `values` - A reference to a vector of `f64` fitness scores.
    ///
    /// # Example
    /// ```
    /// let fitnesses = vec![10.0, 20.0, 30.0, 40.0, 50.0];
    /// Statistics::generate_statistics(&fitnesses);
    /// ```
    pub fn generate_statistics(values: &Vec<f64>) {
        info!("Mean: {}", Statistics::mean(values));
        info!("Median: {}", Statistics::median(values));
        info!("Variance: {}", Statistics::variance(values));
        info!("Std Dev: {}", Statistics::std_dev(values));
        info!("Min-Max: {:?}", Statistics::min_max(values));
        info!("Quartiles: {:?}", Statistics::quartiles(values));

        Statistics::plot_histogram(values, "fitness_histogram.png");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_median_of_a_small_series() {
        let data = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(Statistics::mean(&data), 2.5);
        assert_eq!(Statistics::median(&data), 2.5);
    }

    #[test]
    fn std_dev_of_constant_series_is_zero() {
        let data = vec![5.0; 10];
        assert_eq!(Statistics::std_dev(&data), 0.0);
    }

    #[test]
    fn min_max_and_quartiles_on_a_ten_point_series() {
        let data = vec![7.0, 15.0, 36.0, 39.0, 40.0, 41.0, 42.0, 43.0, 47.0, 49.0];
        assert_eq!(Statistics::min_max(&data), (7.0, 49.0));
        let (q1, q2, q3) = Statistics::quartiles(&data);
        assert!(q1 < q2 && q2 < q3);
    }
}
