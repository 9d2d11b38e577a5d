//! Question bank: ten base questions everyone answers, a follow-up pool
//! picked per person, and the key questions that gate the pair match.

use std::sync::OnceLock;

use pair_core::{Axis, ScoreVector};
use rand::seq::SliceRandom;
use rand::Rng;

const LIKERT_LABELS: [&str; 5] = ["Strongly agree", "Agree", "Neutral", "Disagree", "Strongly disagree"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerOption {
    pub value: u8,
    pub text: &'static str,
    pub score: Vec<(Axis, i32)>,
}

impl AnswerOption {
    pub fn delta(&self, axis: Axis) -> i32 {
        self.score.iter().filter(|(a, _)| *a == axis).map(|(_, d)| d).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    pub id: u32,
    pub text: &'static str,
    pub focus: Option<Axis>,
    pub options: Vec<AnswerOption>,
}

impl Question {
    pub fn option(&self, value: u8) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.value == value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyQuestion {
    pub id: u32,
    pub text: &'static str,
    pub options: Vec<(u8, &'static str)>,
}

/// Five-point scale. `lean` is the delta for "strongly agree"; "agree" gets
/// half of it, neutral nothing, and the disagree side mirrors it.
fn likert(id: u32, text: &'static str, focus: Option<Axis>, lean: &[(Axis, i32)]) -> Question {
    let scale = |step: usize, d: i32| match step {
        0 => d,
        1 => d / 2,
        2 => 0,
        3 => -(d / 2),
        _ => -d,
    };
    let options = LIKERT_LABELS
        .into_iter()
        .enumerate()
        .map(|(step, label)| AnswerOption {
            value: step as u8 + 1,
            text: label,
            score: lean
                .iter()
                .map(|&(axis, d)| (axis, scale(step, d)))
                .filter(|&(_, d)| d != 0)
                .collect(),
        })
        .collect();
    Question { id, text, focus, options }
}

fn build_base() -> Vec<Question> {
    use Axis::*;
    vec![
        likert(1, "I like to plan our dates and take the lead.", Some(Initiative), &[(Initiative, 2)]),
        likert(2, "I need time alone even when things are going well.", Some(Distance), &[(Distance, 2)]),
        likert(3, "Hearing \"I love you\" often matters to me.", Some(Affection), &[(Affection, 2)]),
        likert(4, "I feel uneasy when a reply takes hours.", Some(Security), &[(Security, 2)]),
        likert(
            5,
            "I'm usually the one who suggests trying something new together.",
            Some(Initiative),
            &[(Initiative, 2), (Security, -1)],
        ),
        likert(
            6,
            "Holding hands in public feels natural to me.",
            Some(Affection),
            &[(Affection, 2), (Initiative, 1)],
        ),
        likert(
            7,
            "I'd rather keep some hobbies to myself than share all of them.",
            Some(Distance),
            &[(Distance, 2), (Affection, -1)],
        ),
        likert(8, "Knowing our plans for the week puts me at ease.", Some(Security), &[(Security, 2)]),
        likert(
            9,
            "I say what I feel right away, even when it's awkward.",
            Some(Initiative),
            &[(Initiative, 1), (Affection, 1)],
        ),
        likert(10, "Small physical gestures say more than words to me.", Some(Affection), &[(Affection, 2)]),
    ]
}

fn build_followups() -> Vec<Question> {
    use Axis::*;
    vec![
        likert(11, "A weekend apart doesn't worry me at all.", Some(Distance), &[(Distance, 2), (Security, -1)]),
        likert(12, "A few messages a day feel better than constant chat.", Some(Distance), &[(Distance, 2)]),
        likert(13, "After an argument I'm usually the one to reach out first.", Some(Initiative), &[(Initiative, 2)]),
        likert(14, "I enjoy being the one who decides where we eat.", Some(Initiative), &[(Initiative, 2)]),
        likert(15, "I want to talk about our future early on.", Some(Security), &[(Security, 2)]),
        likert(
            16,
            "A shared routine makes me feel closer to someone.",
            Some(Security),
            &[(Security, 2), (Distance, -1)],
        ),
        likert(17, "I often send sweet messages for no particular reason.", Some(Affection), &[(Affection, 2)]),
        likert(18, "Cuddling is my favourite way to unwind.", Some(Affection), &[(Affection, 2)]),
        likert(19, "I'd describe myself as a romantic.", None, &[(Affection, 1), (Initiative, 1)]),
        likert(
            20,
            "I'd rather talk a problem through immediately than sleep on it.",
            Some(Security),
            &[(Security, 1), (Initiative, 1)],
        ),
    ]
}

fn build_key_questions() -> Vec<KeyQuestion> {
    vec![
        KeyQuestion {
            id: 101,
            text: "How often would you ideally see each other?",
            options: vec![(1, "Several times a week"), (2, "About once a week"), (3, "Whenever it fits")],
        },
        KeyQuestion {
            id: 102,
            text: "How should costs be handled on dates?",
            options: vec![(1, "Split evenly"), (2, "Whoever invited pays"), (3, "Take turns")],
        },
        KeyQuestion {
            id: 103,
            text: "After a fight, what do you want first?",
            options: vec![(1, "Talk it out right away"), (2, "Time to cool down"), (3, "A hug, then talk")],
        },
    ]
}

pub fn base_questions() -> &'static [Question] {
    static BASE: OnceLock<Vec<Question>> = OnceLock::new();
    BASE.get_or_init(build_base)
}

pub fn followup_pool() -> &'static [Question] {
    static FOLLOWUPS: OnceLock<Vec<Question>> = OnceLock::new();
    FOLLOWUPS.get_or_init(build_followups)
}

pub fn key_questions() -> &'static [KeyQuestion] {
    static KEYS: OnceLock<Vec<KeyQuestion>> = OnceLock::new();
    KEYS.get_or_init(build_key_questions)
}

/// Every scored question, base first.
pub fn all_questions() -> impl Iterator<Item = &'static Question> {
    base_questions().iter().chain(followup_pool().iter())
}

pub fn question(id: u32) -> Option<&'static Question> {
    all_questions().find(|q| q.id == id)
}

pub fn key_question(id: u32) -> Option<&'static KeyQuestion> {
    key_questions().iter().find(|q| q.id == id)
}

/// Base questions in a random presentation order.
pub fn shuffled_base_questions<R: Rng + ?Sized>(rng: &mut R) -> Vec<&'static Question> {
    let mut questions: Vec<&'static Question> = base_questions().iter().collect();
    questions.shuffle(rng);
    questions
}

/// Pick up to `n` follow-ups that sharpen the least certain axes: questions
/// whose focus axis has the smallest absolute score come first, unfocused
/// questions last, ties in pool order.
pub fn pick_followup_questions(score: &ScoreVector, n: usize) -> Vec<&'static Question> {
    let mut pool: Vec<&'static Question> = followup_pool().iter().collect();
    pool.sort_by_key(|q| match q.focus {
        Some(axis) => (0, score.get(axis).unsigned_abs()),
        None => (1, 0),
    });
    pool.truncate(n);
    pool
}
