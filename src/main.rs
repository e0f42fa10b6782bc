mod logging;
mod models;
mod scenario;
mod session;

use clap::{Arg, Command};
use logging::{ensure_log_directory, init_logging, parse_log_level, LogConfig, LogOutput};
use models::*;
use scenario::ScenarioConfig;
use session::{print_result_summary, run_scripted};

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("implantsim")
        .version("0.1.0")
        .about("インプラント埋入トレーニングシミュレーション (Implant Placement Simulation)")
        .long_about("歯科インプラント埋入の教育用シミュレーションコア\n\
                     フリーハンド・静的ガイド・ロボットアシストの3メソッドで\n\
                     埋入精度の比較体験を行います。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .long_help("実行するセッションシナリオファイル(.yaml)のパスを指定します。\n\
                           指定しない場合、利用可能なシナリオの一覧を表示します。")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
                .conflicts_with("test")
        )
        .arg(
            Arg::new("test")
                .short('t')
                .long("test")
                .action(clap::ArgAction::SetTrue)
                .help("コアモデルの動作確認を実行")
                .conflicts_with("info")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: デバッグ)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .default_value("info")
                .help("ログレベル (trace, debug, info, warn, error)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("DEST")
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .get_matches();

    // ログシステムの初期化
    let log_config = LogConfig {
        level: parse_log_level(matches.get_one::<String>("log-level").unwrap()),
        output: matches
            .get_one::<String>("log-output")
            .unwrap()
            .parse()
            .unwrap_or(LogOutput::Console),
        ..LogConfig::default()
    };
    if log_config.output != LogOutput::Console {
        if let Err(e) = ensure_log_directory(&log_config.log_dir) {
            eprintln!("警告: ログディレクトリの作成に失敗: {}", e);
        }
    }
    if let Err(e) = init_logging(log_config) {
        eprintln!("警告: ログ初期化に失敗: {}", e);
    }

    println!("インプラント埋入シミュレーション (Implant Placement Simulation) - implantsim v0.1.0");
    println!();

    // 詳細レベルの設定
    let verbose_level = matches.get_count("verbose");
    if verbose_level > 0 {
        println!("詳細出力レベル: {}", verbose_level);
    }

    // テストモードの実行
    if matches.get_flag("test") {
        println!("=== コアモデルテストモード ===");
        test_core_models();
        return;
    }

    // シナリオファイルの処理
    if let Some(scenario_path) = matches.get_one::<String>("scenario") {
        match run_scenario(scenario_path, matches.get_flag("info"), verbose_level) {
            Ok(_) => {
                if verbose_level > 0 {
                    println!("シナリオ実行が正常に完了しました。");
                }
            }
            Err(e) => {
                eprintln!("エラー: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        // デフォルト動作: 利用可能なシナリオ一覧を表示
        show_default_help();
    }
}

/// コアモデルの動作確認
fn test_core_models() {
    println!("\n=== コアモデルの動作確認 ===");

    // メソッドプロファイルテーブル
    let table = MethodProfileTable::builtin();
    for profile in table.all() {
        println!(
            "メソッド登録: {} ({}) 安定性={:.2} 精度={:.2}",
            profile.id, profile.display_name,
            profile.stability_factor, profile.precision_factor
        );
    }

    // 入力→動作変換（決定的な経路）
    let yomi = table.lookup("yomi").unwrap();
    let mut instrument = Pose::new(
        Vector3::zero(),
        EulerRotation::new(std::f64::consts::FRAC_PI_2, 0.0, 0.0),
    );
    let sample = MotionTransform::apply_with_jitter(
        (0.5, 0.5),
        (0.0, 0.0),
        yomi,
        instrument.rotation,
        &mut instrument,
    );
    println!(
        "動作変換 (yomi, 入力0.5/0.5): 角度偏差={:.3}度 深度偏差={:.3}mm",
        sample.angle_deviation_deg, sample.depth_deviation_mm
    );

    // 採点エンジン
    let score = deviation_weighted_score(
        sample.angle_deviation_deg,
        sample.depth_deviation_mm,
        yomi,
    );
    println!(
        "偏差加重スコア: {} ({})",
        score,
        Rating::from_score(score).label()
    );

    // カメラコントローラ
    let mut camera = CameraController::new();
    camera.transition_to(CameraView::Occlusal, 1.0);
    for _ in 0..60 {
        camera.update(1.0 / 60.0);
    }
    println!("カメラ遷移: {} へ切替完了", camera.current_view().name());

    println!("\n全てのコアモデルが正常に動作しました！");
}

/// シナリオファイルを読み込んで実行
fn run_scenario(
    scenario_path: &str,
    info_only: bool,
    verbose_level: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    // シナリオファイルの読み込み
    let scenario = ScenarioConfig::from_file(scenario_path)?;

    if verbose_level > 0 {
        println!("シナリオファイル読み込み完了: {}", scenario_path);
    }

    // 情報表示のみの場合
    if info_only {
        scenario.print_summary();
        return Ok(());
    }

    // シナリオ実行
    execute_scenario(scenario, verbose_level)?;

    Ok(())
}

/// シナリオの実行
fn execute_scenario(
    scenario: ScenarioConfig,
    verbose_level: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    // 基本情報表示
    scenario.print_summary();
    println!();

    if verbose_level > 0 {
        println!("シミュレーション設定:");
        println!("  時間刻み: {:.3}秒", scenario.sim.dt_s);
        println!("  最大時間: {:.1}秒", scenario.sim.t_max_s);
        println!("  シード値: {}", scenario.sim.seed);
        println!();
    }

    let table = scenario.profile_table()?;
    let profile = table
        .lookup(&scenario.method)
        .ok_or_else(|| format!("未知のメソッドID: {}", scenario.method))?
        .clone();

    let mut surface = HeadlessSurface;
    let outcome = run_scripted(&scenario, &mut surface, Box::new(NullSink))?;

    if verbose_level > 0 {
        println!("実行フレーム数: {}", outcome.frames);
        println!();
    }

    print_result_summary(&outcome, &profile);

    Ok(())
}

/// デフォルトヘルプとシナリオ一覧を表示
fn show_default_help() {
    println!("使用方法:");
    println!("  implantsim [オプション]");
    println!();
    println!("オプション:");
    println!("  -s, --scenario <FILE>  シナリオファイルを指定して実行");
    println!("  -i, --info             シナリオ情報のみ表示");
    println!("  -t, --test             コアモデルの動作確認");
    println!("  -v, --verbose          詳細出力 (複数指定で詳細レベル上昇)");
    println!("      --log-level <LVL>  ログレベル指定");
    println!("      --log-output <DST> ログ出力先 (console, file, both)");
    println!("  -h, --help             このヘルプを表示");
    println!();
    println!("利用可能なシナリオファイル:");
    println!("  scenarios/session_yomi.yaml      - ロボットアシスト埋入セッション");
    println!("  scenarios/session_freehand.yaml  - フリーハンド埋入セッション");
    println!();
    println!("例:");
    println!("  implantsim -s scenarios/session_yomi.yaml");
    println!("  implantsim -s scenarios/session_freehand.yaml -v");
    println!("  implantsim -s scenarios/session_yomi.yaml -i");
    println!("  implantsim --test");
}
