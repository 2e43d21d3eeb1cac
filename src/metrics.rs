//! Metrics for evaluating classification results.

/// Fraction `correct / total`, in `[0, 1]`. Zero samples give 0.
pub fn accuracy(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    correct as f64 / total as f64
}

/// Number of predictions equal to their label.
pub fn count_correct(predictions: &[usize], labels: &[u8]) -> usize {
    predictions
        .iter()
        .zip(labels)
        .filter(|&(&p, &l)| p == l as usize)
        .count()
}

/// Confusion matrix indexed as `[true_class][predicted_class]`.
pub fn confusion_matrix(predictions: &[usize], labels: &[u8], num_classes: usize) -> Vec<Vec<usize>> {
    let mut cm = vec![vec![0; num_classes]; num_classes];
    for (&pred_class, &true_class) in predictions.iter().zip(labels) {
        cm[true_class as usize][pred_class] += 1;
    }
    cm
}
