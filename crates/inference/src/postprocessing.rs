use crate::error::InferenceError;
use ndarray::{ArrayViewD, Axis};

/// Index and value of the highest score in the first batch row.
///
/// Accepts `[classes]`, `[batch, classes]`, or `[batch, classes, 1, ...]`
/// outputs. Ties go to the lowest index; NaN scores are never selected.
pub fn argmax(scores: ArrayViewD<'_, f32>) -> Result<(usize, f32), InferenceError> {
    let row = match scores.ndim() {
        0 => {
            return Err(InferenceError::Output(
                "scalar output has no class axis".to_string(),
            ));
        }
        1 => scores,
        _ => {
            if scores.len_of(Axis(0)) == 0 {
                return Err(InferenceError::Output("empty batch".to_string()));
            }
            let row = scores.index_axis_move(Axis(0), 0);
            let class_axes = row.shape().iter().filter(|&&d| d > 1).count();
            if class_axes > 1 {
                return Err(InferenceError::Output(format!(
                    "cannot reduce output row of shape {:?} to class scores",
                    row.shape()
                )));
            }
            row
        }
    };

    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in row.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((index, score)),
        }
    }

    best.ok_or_else(|| {
        InferenceError::Output(format!(
            "no comparable class scores in output of shape {:?}",
            row.shape()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn, array};

    #[test]
    fn test_argmax_batch_row() {
        let scores = array![[0.1f32, 0.7, 0.2]].into_dyn();
        assert_eq!(argmax(scores.view()).unwrap(), (1, 0.7));
    }

    #[test]
    fn test_argmax_uses_only_first_batch_row() {
        let scores = array![[0.9f32, 0.1], [0.0, 5.0]].into_dyn();
        assert_eq!(argmax(scores.view()).unwrap().0, 0);
    }

    #[test]
    fn test_argmax_flat_vector() {
        let scores = array![-3.0f32, -1.0, -2.0].into_dyn();
        assert_eq!(argmax(scores.view()).unwrap(), (1, -1.0));
    }

    #[test]
    fn test_argmax_tie_picks_first() {
        let scores = array![[0.5f32, 0.5, 0.1]].into_dyn();
        assert_eq!(argmax(scores.view()).unwrap().0, 0);
    }

    #[test]
    fn test_argmax_trailing_singleton_axes() {
        let scores =
            ArrayD::from_shape_vec(IxDyn(&[1, 4, 1, 1]), vec![0.0f32, 0.1, 0.0, 0.9]).unwrap();
        assert_eq!(argmax(scores.view()).unwrap().0, 3);
    }

    #[test]
    fn test_argmax_skips_nan() {
        let scores = array![[f32::NAN, 0.2, 0.1]].into_dyn();
        assert_eq!(argmax(scores.view()).unwrap().0, 1);
    }

    #[test]
    fn test_argmax_rejects_degenerate_outputs() {
        let empty = ArrayD::<f32>::zeros(IxDyn(&[1, 0]));
        assert!(argmax(empty.view()).is_err());

        let no_batch = ArrayD::<f32>::zeros(IxDyn(&[0, 3]));
        assert!(argmax(no_batch.view()).is_err());

        let all_nan = array![[f32::NAN, f32::NAN]].into_dyn();
        assert!(argmax(all_nan.view()).is_err());

        let grid = ArrayD::<f32>::zeros(IxDyn(&[1, 3, 4]));
        assert!(matches!(
            argmax(grid.view()),
            Err(InferenceError::Output(_))
        ));
    }
}
